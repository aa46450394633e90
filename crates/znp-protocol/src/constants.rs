//! Protocol constants
//!
//! Framing bytes, address conventions and configuration identifiers of the
//! ZNP serial interface.

// ============================================================================
// Framing
// ============================================================================

/// Start-of-frame marker.
pub const SOF: u8 = 0xFE;

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD: usize = 250;

/// SOF + length + cmd0 + cmd1 + FCS.
pub const FRAME_OVERHEAD: usize = 5;

/// Bytes written on open to skip the serial bootloader's wait window.
pub const BOOTLOADER_BYPASS: [u8; 4] = [0x00, 0x07, 0x00, 0x07];

// ============================================================================
// Addressing
// ============================================================================

/// Network (short) address of the coordinator.
pub const COORDINATOR_ADDRESS: u16 = 0x0000;
/// Address the radio reports for an empty association table slot.
pub const INVALID_ADDRESS: u16 = 0xFFFE;
/// Broadcast to all routers and the coordinator.
pub const BROADCAST_ROUTERS: u16 = 0xFFFC;
/// Broadcast to all devices with receivers on when idle.
pub const BROADCAST_RX_ON_WHEN_IDLE: u16 = 0xFFFD;
/// Broadcast to every device.
pub const BROADCAST_ALL: u16 = 0xFFFF;

/// Address modes of an AF destination.
pub mod address_mode {
    pub const NOT_PRESENT: u8 = 0;
    pub const GROUP: u8 = 1;
    pub const ADDR_16_BIT: u8 = 2;
    pub const ADDR_64_BIT: u8 = 3;
    pub const BROADCAST: u8 = 15;
}

/// Relation of an associated device to the coordinator.
pub mod node_relation {
    pub const PARENT: u8 = 0;
    pub const CHILD_RFD: u8 = 1;
    pub const CHILD_RFD_RX_IDLE: u8 = 2;
    pub const CHILD_FFD: u8 = 3;
    pub const CHILD_FFD_RX_IDLE: u8 = 4;
    pub const NEIGHBOR: u8 = 5;
    pub const OTHER: u8 = 6;
}

// ============================================================================
// Application endpoint registered on the coordinator
// ============================================================================

/// Endpoint the host application registers and sends from.
pub const DEFAULT_ENDPOINT: u8 = 20;
/// Default AF radius.
pub const DEFAULT_RADIUS: u8 = 32;
/// Default AF transaction id.
pub const DEFAULT_TRANSACTION_ID: u8 = 2;

// ============================================================================
// Non-volatile configuration (ZB_WRITE_CONFIGURATION ids)
// ============================================================================

pub mod config_id {
    pub const STARTUP_OPTION: u8 = 0x03;
    pub const PRECFGKEY: u8 = 0x62;
    pub const PRECFGKEYS_ENABLE: u8 = 0x63;
    pub const SECURITY_MODE: u8 = 0x64;
    pub const PANID: u8 = 0x83;
    pub const CHANLIST: u8 = 0x84;
    pub const LOGICAL_TYPE: u8 = 0x87;
    pub const ZDO_DIRECT_CB: u8 = 0x8F;
}

/// STARTUP_OPTION bits.
pub mod startup_option {
    pub const CLEAR_CONFIG: u8 = 0x01;
    pub const CLEAR_STATE: u8 = 0x02;
}

/// LOGICAL_TYPE values.
pub mod logical_type {
    pub const COORDINATOR: u8 = 0x00;
    pub const ROUTER: u8 = 0x01;
    pub const END_DEVICE: u8 = 0x02;
}

/// Channel list bit for channel 11.
pub const CHANNEL_11: u32 = 0x0000_0800;

/// SYS_RESET_REQ reset types.
pub mod reset_type {
    pub const HARD: u8 = 0x00;
    pub const SOFT: u8 = 0x01;
}

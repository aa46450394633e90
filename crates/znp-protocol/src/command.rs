//! Command identity: type, subsystem and id.
//!
//! The first command byte packs the frame type into the top three bits and the
//! subsystem into the low five. The second byte is the command id within the
//! subsystem. A synchronous request and its reply share subsystem and id and
//! differ only in type, so names are looked up by (subsystem, id).

use std::fmt;

/// Frame type (top three bits of cmd0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Poll,
    /// Synchronous request; answered by an [`CommandType::Srsp`].
    Sreq,
    /// Asynchronous request or indication.
    Areq,
    /// Synchronous response.
    Srsp,
    Unknown(u8),
}

impl CommandType {
    pub const MASK: u8 = 0xE0;

    pub fn from_cmd0(cmd0: u8) -> Self {
        match cmd0 & Self::MASK {
            0x00 => CommandType::Poll,
            0x20 => CommandType::Sreq,
            0x40 => CommandType::Areq,
            0x60 => CommandType::Srsp,
            other => CommandType::Unknown(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            CommandType::Poll => 0x00,
            CommandType::Sreq => 0x20,
            CommandType::Areq => 0x40,
            CommandType::Srsp => 0x60,
            CommandType::Unknown(bits) => *bits & Self::MASK,
        }
    }
}

/// Subsystem (low five bits of cmd0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Res0,
    Sys,
    Mac,
    Nwk,
    Af,
    Zdo,
    Sapi,
    Util,
    Debug,
    App,
    Unknown(u8),
}

impl Subsystem {
    pub const MASK: u8 = 0x1F;

    pub fn from_cmd0(cmd0: u8) -> Self {
        match cmd0 & Self::MASK {
            0 => Subsystem::Res0,
            1 => Subsystem::Sys,
            2 => Subsystem::Mac,
            3 => Subsystem::Nwk,
            4 => Subsystem::Af,
            5 => Subsystem::Zdo,
            6 => Subsystem::Sapi,
            7 => Subsystem::Util,
            8 => Subsystem::Debug,
            9 => Subsystem::App,
            other => Subsystem::Unknown(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            Subsystem::Res0 => 0,
            Subsystem::Sys => 1,
            Subsystem::Mac => 2,
            Subsystem::Nwk => 3,
            Subsystem::Af => 4,
            Subsystem::Zdo => 5,
            Subsystem::Sapi => 6,
            Subsystem::Util => 7,
            Subsystem::Debug => 8,
            Subsystem::App => 9,
            Subsystem::Unknown(bits) => *bits & Self::MASK,
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Unknown(bits) => write!(f, "SUBSYSTEM_{bits}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A named entry of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: &'static str,
    /// Type used when the host sends this command.
    pub kind: CommandType,
    pub subsystem: Subsystem,
    pub id: u8,
}

impl CommandDescriptor {
    /// cmd0 byte for the host-to-radio direction.
    pub fn cmd0(&self) -> u8 {
        self.kind.bits() | self.subsystem.bits()
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

const fn cmd(name: &'static str, kind: CommandType, subsystem: Subsystem, id: u8) -> CommandDescriptor {
    CommandDescriptor { name, kind, subsystem, id }
}

use CommandType::{Areq, Sreq};
use Subsystem::{Af, Sapi, Sys, Util, Zdo};

/// Every command this host sends or understands.
pub static COMMANDS: &[CommandDescriptor] = &[
    // SYS
    cmd("SYS_RESET_REQ", Areq, Sys, 0x00),
    cmd("SYS_PING", Sreq, Sys, 0x01),
    cmd("SYS_VERSION", Sreq, Sys, 0x02),
    cmd("SYS_RESET_IND", Areq, Sys, 0x80),
    // AF
    cmd("AF_REGISTER", Sreq, Af, 0x00),
    cmd("AF_DATA_REQUEST", Sreq, Af, 0x01),
    cmd("AF_DATA_REQUEST_EXT", Sreq, Af, 0x02),
    cmd("AF_DATA_CONFIRM", Areq, Af, 0x80),
    cmd("AF_INCOMING_MSG", Areq, Af, 0x81),
    cmd("AF_INCOMING_MSG_EXT", Areq, Af, 0x82),
    // ZDO requests
    cmd("ZDO_NWK_ADDR_REQ", Sreq, Zdo, 0x00),
    cmd("ZDO_IEEE_ADDR_REQ", Sreq, Zdo, 0x01),
    cmd("ZDO_NODE_DESC_REQ", Sreq, Zdo, 0x02),
    cmd("ZDO_SIMPLE_DESC_REQ", Sreq, Zdo, 0x04),
    cmd("ZDO_ACTIVE_EP_REQ", Sreq, Zdo, 0x05),
    cmd("ZDO_MATCH_DESC_REQ", Sreq, Zdo, 0x06),
    cmd("ZDO_MGMT_PERMIT_JOIN_REQ", Sreq, Zdo, 0x36),
    cmd("ZDO_MSG_CB_REGISTER", Sreq, Zdo, 0x3E),
    cmd("ZDO_STARTUP_FROM_APP", Sreq, Zdo, 0x40),
    // ZDO callbacks
    cmd("ZDO_NWK_ADDR_RSP", Areq, Zdo, 0x80),
    cmd("ZDO_IEEE_ADDR_RSP", Areq, Zdo, 0x81),
    cmd("ZDO_NODE_DESC_RSP", Areq, Zdo, 0x82),
    cmd("ZDO_SIMPLE_DESC_RSP", Areq, Zdo, 0x84),
    cmd("ZDO_ACTIVE_EP_RSP", Areq, Zdo, 0x85),
    cmd("ZDO_MATCH_DESC_RSP", Areq, Zdo, 0x86),
    cmd("ZDO_MGMT_PERMIT_JOIN_RSP", Areq, Zdo, 0xB6),
    cmd("ZDO_STATE_CHANGE_IND", Areq, Zdo, 0xC0),
    cmd("ZDO_END_DEVICE_ANNCE_IND", Areq, Zdo, 0xC1),
    cmd("ZDO_TC_DEV_IND", Areq, Zdo, 0xCA),
    // SAPI
    cmd("ZB_START_REQUEST", Sreq, Sapi, 0x00),
    cmd("ZB_READ_CONFIGURATION", Sreq, Sapi, 0x04),
    cmd("ZB_WRITE_CONFIGURATION", Sreq, Sapi, 0x05),
    cmd("ZB_PERMIT_JOINING_REQUEST", Sreq, Sapi, 0x08),
    cmd("ZB_START_CONFIRM", Areq, Sapi, 0x80),
    // UTIL
    cmd("UTIL_GET_DEVICE_INFO", Sreq, Util, 0x00),
    cmd("UTIL_ADDRMGR_NWK_ADDR_LOOKUP", Sreq, Util, 0x41),
    cmd("UTIL_ASSOC_COUNT", Sreq, Util, 0x48),
    cmd("UTIL_ASSOC_FIND_DEVICE", Sreq, Util, 0x49),
    cmd("UTIL_ASSOC_GET_WITH_ADDRESS", Sreq, Util, 0x4A),
];

/// Look up a command by name.
pub fn command_by_name(name: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Look up a command by subsystem and id, ignoring the frame type.
pub fn command_by_id(subsystem: Subsystem, id: u8) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|c| c.subsystem == subsystem && c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd0_packing() {
        let ping = command_by_name("SYS_PING").unwrap();
        assert_eq!(ping.cmd0(), 0x21);
        assert_eq!(command_by_name("AF_DATA_REQUEST_EXT").unwrap().cmd0(), 0x24);
        assert_eq!(command_by_name("SYS_RESET_REQ").unwrap().cmd0(), 0x41);
    }

    #[test]
    fn test_reply_shares_name() {
        // SRSP of SYS_PING: cmd0 0x61
        let reply = command_by_id(Subsystem::from_cmd0(0x61), 0x01).unwrap();
        assert_eq!(reply.name, "SYS_PING");
        assert_eq!(CommandType::from_cmd0(0x61), CommandType::Srsp);
    }

    #[test]
    fn test_names_unique() {
        for (i, a) in COMMANDS.iter().enumerate() {
            for b in &COMMANDS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert!(
                    !(a.subsystem == b.subsystem && a.id == b.id),
                    "{} and {} share an id",
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn test_unknown_bits_preserved() {
        assert_eq!(Subsystem::from_cmd0(0x2F), Subsystem::Unknown(0x0F));
        assert_eq!(Subsystem::Unknown(0x0F).bits(), 0x0F);
        assert_eq!(CommandType::from_cmd0(0xA1), CommandType::Unknown(0xA0));
    }
}

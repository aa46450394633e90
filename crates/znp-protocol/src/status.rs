//! Radio status codes and device states.

use std::fmt;

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $ty:ident { $($variant:ident = $code:literal => $name:literal,)* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $ty {
            $($variant,)*
            /// Code outside the known table.
            Unknown(u8),
        }

        impl From<u8> for $ty {
            fn from(code: u8) -> Self {
                match code {
                    $($code => $ty::$variant,)*
                    other => $ty::Unknown(other),
                }
            }
        }

        impl From<$ty> for u8 {
            fn from(value: $ty) -> Self {
                match value {
                    $($ty::$variant => $code,)*
                    $ty::Unknown(code) => code,
                }
            }
        }

        impl $ty {
            pub fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)*
                    $ty::Unknown(_) => "unknown",
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} (0x{:02x})", self.name(), u8::from(*self))
            }
        }
    };
}

code_enum! {
    /// Status byte of a synchronous reply or ZDO callback.
    pub enum ZnpStatus {
        Success = 0x00 => "ZSuccess",
        Failure = 0x01 => "ZFailure",
        InvalidParameter = 0x02 => "ZInvalidParameter",
        NvItemUninit = 0x09 => "NV_ITEM_UNINIT",
        NvOperFailed = 0x0a => "NV_OPER_FAILED",
        NvBadItemLen = 0x0c => "NV_BAD_ITEM_LEN",
        MemError = 0x10 => "ZMemError",
        BufferFull = 0x11 => "ZBufferFull",
        UnsupportedMode = 0x12 => "ZUnsupportedMode",
        MacMemError = 0x13 => "ZMacMemError",
        ZdoInvalidRequestType = 0x80 => "zdoInvalidRequestType",
        ZdoInvalidEndpoint = 0x82 => "zdoInvalidEndpoint",
        ZdoUnsupported = 0x84 => "zdoUnsupported",
        ZdoTimeout = 0x85 => "zdoTimeout",
        ZdoNoMatch = 0x86 => "zdoNoMatch",
        ZdoTableFull = 0x87 => "zdoTableFull",
        ZdoNoBindEntry = 0x88 => "zdoNoBindEntry",
        SecNoKey = 0xa1 => "ZSecNoKey",
        SecMaxFrmCount = 0xa3 => "ZSecMaxFrmCount",
        ApsFail = 0xb1 => "ZApsFail",
        ApsTableFull = 0xb2 => "ZApsTableFull",
        ApsIllegalRequest = 0xb3 => "ZApsIllegalRequest",
        ApsInvalidBinding = 0xb4 => "ZApsInvalidBinding",
        ApsUnsupportedAttrib = 0xb5 => "ZApsUnsupportedAttrib",
        ApsNotSupported = 0xb6 => "ZApsNotSupported",
        ApsNoAck = 0xb7 => "ZApsNoAck",
        ApsDuplicateEntry = 0xb8 => "ZApsDuplicateEntry",
        ApsNoBoundDevice = 0xb9 => "ZApsNoBoundDevice",
        NwkInvalidParam = 0xc1 => "ZNwkInvalidParam",
        NwkInvalidRequest = 0xc2 => "ZNwkInvalidRequest",
        NwkNotPermitted = 0xc3 => "ZNwkNotPermitted",
        NwkStartupFailure = 0xc4 => "ZNwkStartupFailure",
        NwkTableFull = 0xc7 => "ZNwkTableFull",
        NwkUnknownDevice = 0xc8 => "ZNwkUnknownDevice",
        NwkUnsupportedAttribute = 0xc9 => "ZNwkUnsupportedAttribute",
        NwkNoNetworks = 0xca => "ZNwkNoNetworks",
        NwkLeaveUnconfirmed = 0xcb => "ZNwkLeaveUnconfirmed",
        NwkNoAck = 0xcc => "ZNwkNoAck",
        NwkNoRoute = 0xcd => "ZNwkNoRoute",
        MacNoAck = 0xe9 => "ZMacNoACK",
    }
}

impl ZnpStatus {
    pub fn is_success(&self) -> bool {
        *self == ZnpStatus::Success
    }
}

code_enum! {
    /// Device state reported by ZDO_STATE_CHANGE_IND.
    pub enum ZdoState {
        DevHold = 0 => "DEV_HOLD",
        DevInit = 1 => "DEV_INIT",
        DevNwkDisc = 2 => "DEV_NWK_DISC",
        DevNwkJoining = 3 => "DEV_NWK_JOINING",
        DevNwkRejoin = 4 => "DEV_NWK_REJOIN",
        DevEndDeviceUnauth = 5 => "DEV_END_DEVICE_UNAUTH",
        DevEndDevice = 6 => "DEV_END_DEVICE",
        DevRouter = 7 => "DEV_ROUTER",
        DevCoordStarting = 8 => "DEV_COORD_STARTING",
        DevZbCoord = 9 => "DEV_ZB_COORD",
        DevNwkOrphan = 10 => "DEV_NWK_ORPHAN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ZnpStatus::from(0x00), ZnpStatus::Success);
        assert_eq!(ZnpStatus::from(0xcd), ZnpStatus::NwkNoRoute);
        assert_eq!(ZnpStatus::from(0x55), ZnpStatus::Unknown(0x55));
        assert_eq!(u8::from(ZnpStatus::MacNoAck), 0xe9);
        assert_eq!(ZnpStatus::ZdoTimeout.to_string(), "zdoTimeout (0x85)");
    }

    #[test]
    fn test_zdo_states() {
        assert_eq!(ZdoState::from(9), ZdoState::DevZbCoord);
        assert_eq!(ZdoState::from(42), ZdoState::Unknown(42));
        assert_eq!(ZdoState::DevZbCoord.name(), "DEV_ZB_COORD");
    }
}

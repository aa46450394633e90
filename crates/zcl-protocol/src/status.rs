//! ZCL status codes carried in responses.

use std::fmt;

macro_rules! zcl_status {
    ($($variant:ident = $code:literal => $name:literal,)*) => {
        /// Status byte of a ZCL response record.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ZclStatus {
            $($variant,)*
            /// Code outside the known table.
            Unknown(u8),
        }

        impl From<u8> for ZclStatus {
            fn from(code: u8) -> Self {
                match code {
                    $($code => ZclStatus::$variant,)*
                    other => ZclStatus::Unknown(other),
                }
            }
        }

        impl From<ZclStatus> for u8 {
            fn from(status: ZclStatus) -> Self {
                match status {
                    $(ZclStatus::$variant => $code,)*
                    ZclStatus::Unknown(code) => code,
                }
            }
        }

        impl ZclStatus {
            /// Upper-case symbolic name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(ZclStatus::$variant => $name,)*
                    ZclStatus::Unknown(_) => "UNKNOWN",
                }
            }
        }
    };
}

zcl_status! {
    Success = 0x00 => "SUCCESS",
    Failure = 0x02 => "FAILURE",
    MalformedCommand = 0x80 => "MALFORMED_COMMAND",
    UnsupClusterCommand = 0x81 => "UNSUP_CLUSTER_COMMAND",
    UnsupGeneralCommand = 0x82 => "UNSUP_GENERAL_COMMAND",
    UnsupManufClusterCommand = 0x83 => "UNSUP_MANUF_CLUSTER_COMMAND",
    UnsupManufGeneralCommand = 0x84 => "UNSUP_MANUF_GENERAL_COMMAND",
    InvalidField = 0x85 => "INVALID_FIELD",
    UnsupportedAttribute = 0x86 => "UNSUPPORTED_ATTRIBUTE",
    InvalidValue = 0x87 => "INVALID_VALUE",
    ReadOnly = 0x88 => "READ_ONLY",
    InsufficientSpace = 0x89 => "INSUFFICIENT_SPACE",
    DuplicateExists = 0x8a => "DUPLICATE_EXISTS",
    NotFound = 0x8b => "NOT_FOUND",
    UnreportableAttribute = 0x8c => "UNREPORTABLE_ATTRIBUTE",
    InvalidDataType = 0x8d => "INVALID_DATA_TYPE",
    InvalidSelector = 0x8e => "INVALID_SELECTOR",
    WriteOnly = 0x8f => "WRITE_ONLY",
    InconsistentStartupState = 0x90 => "INCONSISTENT_STARTUP_STATE",
    DefinedOutOfBand = 0x91 => "DEFINED_OUT_OF_BAND",
    Inconsistent = 0x92 => "INCONSISTENT",
    ActionDenied = 0x93 => "ACTION_DENIED",
    Timeout = 0x94 => "TIMEOUT",
    HardwareFailure = 0xc0 => "HARDWARE_FAILURE",
    SoftwareFailure = 0xc1 => "SOFTWARE_FAILURE",
    CalibrationError = 0xc2 => "CALIBRATION_ERROR",
}

impl ZclStatus {
    pub fn is_success(&self) -> bool {
        *self == ZclStatus::Success
    }
}

impl fmt::Display for ZclStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZclStatus::Unknown(code) => write!(f, "UNKNOWN (0x{code:02x})"),
            known => write!(f, "{} (0x{:02x})", known.name(), u8::from(*known)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(ZclStatus::from(0x86), ZclStatus::UnsupportedAttribute);
        assert_eq!(u8::from(ZclStatus::ReadOnly), 0x88);
        assert_eq!(ZclStatus::from(0x77), ZclStatus::Unknown(0x77));
        assert_eq!(u8::from(ZclStatus::Unknown(0x77)), 0x77);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ZclStatus::Success.to_string(), "SUCCESS (0x00)");
        assert_eq!(ZclStatus::Unknown(0xfe).to_string(), "UNKNOWN (0xfe)");
    }
}

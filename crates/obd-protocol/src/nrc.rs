//! Negative response codes (ISO 14229-1 annex A)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason carried in the third byte of a `7F <service> <nrc>` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nrc {
    GeneralReject,
    ServiceNotSupported,
    SubFunctionNotSupported,
    IncorrectMessageLengthOrInvalidFormat,
    ResponseTooLong,
    BusyRepeatRequest,
    ConditionsNotCorrect,
    RequestSequenceError,
    NoResponseFromSubnetComponent,
    FailurePreventsExecutionOfRequestedAction,
    RequestOutOfRange,
    SecurityAccessDenied,
    InvalidKey,
    ExceedNumberOfAttempts,
    RequiredTimeDelayNotExpired,
    UploadDownloadNotAccepted,
    TransferDataSuspended,
    GeneralProgrammingFailure,
    WrongBlockSequenceCounter,
    ResponsePending,
    SubFunctionNotSupportedInActiveSession,
    ServiceNotSupportedInActiveSession,
    RpmTooHigh,
    RpmTooLow,
    EngineIsRunning,
    EngineIsNotRunning,
    EngineRunTimeTooLow,
    TemperatureTooHigh,
    TemperatureTooLow,
    VehicleSpeedTooHigh,
    VehicleSpeedTooLow,
    ThrottlePedalTooHigh,
    ThrottlePedalTooLow,
    TransmissionRangeNotInNeutral,
    TransmissionRangeNotInGear,
    BrakeSwitchesNotClosed,
    ShifterLeverNotInPark,
    TorqueConverterClutchLocked,
    VoltageTooHigh,
    VoltageTooLow,
    /// 0xF0..=0xFE
    ManufacturerSpecific(u8),
    Unknown(u8),
}

impl Nrc {
    pub fn from_byte(code: u8) -> Self {
        match code {
            0x10 => Nrc::GeneralReject,
            0x11 => Nrc::ServiceNotSupported,
            0x12 => Nrc::SubFunctionNotSupported,
            0x13 => Nrc::IncorrectMessageLengthOrInvalidFormat,
            0x14 => Nrc::ResponseTooLong,
            0x21 => Nrc::BusyRepeatRequest,
            0x22 => Nrc::ConditionsNotCorrect,
            0x24 => Nrc::RequestSequenceError,
            0x25 => Nrc::NoResponseFromSubnetComponent,
            0x26 => Nrc::FailurePreventsExecutionOfRequestedAction,
            0x31 => Nrc::RequestOutOfRange,
            0x33 => Nrc::SecurityAccessDenied,
            0x35 => Nrc::InvalidKey,
            0x36 => Nrc::ExceedNumberOfAttempts,
            0x37 => Nrc::RequiredTimeDelayNotExpired,
            0x70 => Nrc::UploadDownloadNotAccepted,
            0x71 => Nrc::TransferDataSuspended,
            0x72 => Nrc::GeneralProgrammingFailure,
            0x73 => Nrc::WrongBlockSequenceCounter,
            0x78 => Nrc::ResponsePending,
            0x7E => Nrc::SubFunctionNotSupportedInActiveSession,
            0x7F => Nrc::ServiceNotSupportedInActiveSession,
            0x81 => Nrc::RpmTooHigh,
            0x82 => Nrc::RpmTooLow,
            0x83 => Nrc::EngineIsRunning,
            0x84 => Nrc::EngineIsNotRunning,
            0x85 => Nrc::EngineRunTimeTooLow,
            0x86 => Nrc::TemperatureTooHigh,
            0x87 => Nrc::TemperatureTooLow,
            0x88 => Nrc::VehicleSpeedTooHigh,
            0x89 => Nrc::VehicleSpeedTooLow,
            0x8A => Nrc::ThrottlePedalTooHigh,
            0x8B => Nrc::ThrottlePedalTooLow,
            0x8C => Nrc::TransmissionRangeNotInNeutral,
            0x8D => Nrc::TransmissionRangeNotInGear,
            0x8F => Nrc::BrakeSwitchesNotClosed,
            0x90 => Nrc::ShifterLeverNotInPark,
            0x91 => Nrc::TorqueConverterClutchLocked,
            0x92 => Nrc::VoltageTooHigh,
            0x93 => Nrc::VoltageTooLow,
            0xF0..=0xFE => Nrc::ManufacturerSpecific(code),
            other => Nrc::Unknown(other),
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Nrc::GeneralReject => 0x10,
            Nrc::ServiceNotSupported => 0x11,
            Nrc::SubFunctionNotSupported => 0x12,
            Nrc::IncorrectMessageLengthOrInvalidFormat => 0x13,
            Nrc::ResponseTooLong => 0x14,
            Nrc::BusyRepeatRequest => 0x21,
            Nrc::ConditionsNotCorrect => 0x22,
            Nrc::RequestSequenceError => 0x24,
            Nrc::NoResponseFromSubnetComponent => 0x25,
            Nrc::FailurePreventsExecutionOfRequestedAction => 0x26,
            Nrc::RequestOutOfRange => 0x31,
            Nrc::SecurityAccessDenied => 0x33,
            Nrc::InvalidKey => 0x35,
            Nrc::ExceedNumberOfAttempts => 0x36,
            Nrc::RequiredTimeDelayNotExpired => 0x37,
            Nrc::UploadDownloadNotAccepted => 0x70,
            Nrc::TransferDataSuspended => 0x71,
            Nrc::GeneralProgrammingFailure => 0x72,
            Nrc::WrongBlockSequenceCounter => 0x73,
            Nrc::ResponsePending => 0x78,
            Nrc::SubFunctionNotSupportedInActiveSession => 0x7E,
            Nrc::ServiceNotSupportedInActiveSession => 0x7F,
            Nrc::RpmTooHigh => 0x81,
            Nrc::RpmTooLow => 0x82,
            Nrc::EngineIsRunning => 0x83,
            Nrc::EngineIsNotRunning => 0x84,
            Nrc::EngineRunTimeTooLow => 0x85,
            Nrc::TemperatureTooHigh => 0x86,
            Nrc::TemperatureTooLow => 0x87,
            Nrc::VehicleSpeedTooHigh => 0x88,
            Nrc::VehicleSpeedTooLow => 0x89,
            Nrc::ThrottlePedalTooHigh => 0x8A,
            Nrc::ThrottlePedalTooLow => 0x8B,
            Nrc::TransmissionRangeNotInNeutral => 0x8C,
            Nrc::TransmissionRangeNotInGear => 0x8D,
            Nrc::BrakeSwitchesNotClosed => 0x8F,
            Nrc::ShifterLeverNotInPark => 0x90,
            Nrc::TorqueConverterClutchLocked => 0x91,
            Nrc::VoltageTooHigh => 0x92,
            Nrc::VoltageTooLow => 0x93,
            Nrc::ManufacturerSpecific(code) | Nrc::Unknown(code) => *code,
        }
    }

    /// The ECU may answer a repeated request differently
    pub fn is_temporary(&self) -> bool {
        matches!(self, Nrc::BusyRepeatRequest | Nrc::ResponsePending)
    }
}

impl From<u8> for Nrc {
    fn from(code: u8) -> Self {
        Nrc::from_byte(code)
    }
}

impl fmt::Display for Nrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, self.as_byte())
    }
}

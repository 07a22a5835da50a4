use crate::error::WireError;

/// The closed set of command opcodes understood by the native endpoint.
///
/// An opcode byte outside this set is a fatal protocol error on the native
/// side (§4.3): the command loop breaks rather than trying to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    GetArgs = 0x01,
    ReadInput = 0x02,
    WriteOut = 0x03,
    WriteErr = 0x04,
    GetCwd = 0x05,
    GetEnv = 0x06,
    Exit = 0x07,
    CloseInput = 0x09,
    CloseOut = 0x0A,
    CloseErr = 0x0B,
    IsInputConnected = 0x0C,
}

impl Opcode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = WireError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Opcode::GetArgs),
            0x02 => Ok(Opcode::ReadInput),
            0x03 => Ok(Opcode::WriteOut),
            0x04 => Ok(Opcode::WriteErr),
            0x05 => Ok(Opcode::GetCwd),
            0x06 => Ok(Opcode::GetEnv),
            0x07 => Ok(Opcode::Exit),
            0x09 => Ok(Opcode::CloseInput),
            0x0A => Ok(Opcode::CloseOut),
            0x0B => Ok(Opcode::CloseErr),
            0x0C => Ok(Opcode::IsInputConnected),
            other => Err(WireError::UnknownOpcode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_opcode() {
        for op in [
            Opcode::GetArgs,
            Opcode::ReadInput,
            Opcode::WriteOut,
            Opcode::WriteErr,
            Opcode::GetCwd,
            Opcode::GetEnv,
            Opcode::Exit,
            Opcode::CloseInput,
            Opcode::CloseOut,
            Opcode::CloseErr,
            Opcode::IsInputConnected,
        ] {
            assert_eq!(Opcode::try_from(op.as_u8()).unwrap(), op);
        }
    }

    #[test]
    fn rejects_unknown_opcodes() {
        for byte in [0x00, 0x08, 0x0D, 0xFF] {
            assert!(matches!(
                Opcode::try_from(byte),
                Err(WireError::UnknownOpcode(b)) if b == byte
            ));
        }
    }
}

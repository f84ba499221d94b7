use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),

    // Load errors
    #[error("Corrupt or unsupported executable: unknown pool item kind 0x{1:02X} at #{0}")]
    UnknownPoolItemKind(usize, u8),

    #[error("Corrupt or unsupported executable: unknown segment {1} for pool item #{0}")]
    UnknownSegment(usize, u32),

    #[error("Corrupt or unsupported executable: unknown relocation target {1} for pool item #{0}")]
    UnknownRelocationTarget(usize, u8),

    #[error("Corrupt or unsupported executable: pool item #{0} references ordinal {1} out of range")]
    PoolOrdinalOutOfRange(usize, u32),

    #[error("Corrupt or unsupported executable: pool item #{0} references itself")]
    CyclicPoolReference(usize),

    #[error("Corrupt or unsupported executable: pool resolution deeper than {0}")]
    ResolveDepthExceeded(usize),

    #[error("Corrupt or unsupported executable: program image does not fit in the address space")]
    ImageTooLarge,

    #[error("Program memory too small: need {0} bytes, got {1}")]
    ProgramMemoryTooSmall(u32, usize),

    // Runtime errors
    #[error("Memory access out of range: 0x{0:08X} (+{1})")]
    MemoryOutOfRange(u32, u32),

    #[error("Undefined opcode 0x{1:02X} at 0x{0:08X}")]
    UndefinedOpcode(u32, u8),

    #[error("Invalid register field {1} at 0x{0:08X}")]
    InvalidRegister(u32, u8),

    #[error("Division by zero at 0x{0:08X}")]
    DivisionByZero(u32),

    #[error("Pool ordinal {0} out of range")]
    InvalidPoolOrdinal(u32),

    #[error("Trying to call a non-import/non-integer pool data: #{0}")]
    InvalidCallTarget(u32),

    #[error("Trying to call unresolved import `{1}` (#{0})")]
    UnresolvedImport(u32, String),

    #[error("Pool data #{0} does not hold an integer")]
    NotAnInteger(u32),
}

impl Error {
    /// Load-time failure caused by the executable itself.
    pub fn is_corrupt_executable(&self) -> bool {
        matches!(
            self,
            Error::UnknownPoolItemKind(..)
                | Error::UnknownSegment(..)
                | Error::UnknownRelocationTarget(..)
                | Error::PoolOrdinalOutOfRange(..)
                | Error::CyclicPoolReference(..)
                | Error::ResolveDepthExceeded(..)
                | Error::ImageTooLarge
        )
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SonarError {
    #[error("could not resolve hostname: {host}")]
    ResolveHostFailed { host: String },
    #[error("raw icmp socket needs elevated privileges: {e}")]
    RawSocketPermission { e: String },
    #[error("build echo packet error occurred at [{location}]")]
    BuildPacketError { location: String },
    #[error("system time error")]
    SystemTimeError(#[from] std::time::SystemTimeError),
    #[error("io error")]
    IOError(#[from] std::io::Error),
    #[error("log error")]
    SetLoggerError(#[from] tracing::subscriber::SetGlobalDefaultError),
}

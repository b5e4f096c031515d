#![forbid(unsafe_code)]
//! mailprobe_lib: vérifie qu'une adresse e-mail est délivrable sans envoyer
//! de message: syntaxe, MX, sonde SMTP (`RCPT TO`) puis détection catch-all.

pub mod mx;
pub mod probe;
pub mod validator;
pub mod verify;

pub use mx::{Error as MxError, ExchangeHost, MxStatus, check_mx, resolve_exchanges};
pub use probe::{
    AttemptOutcome, AttemptStage, CatchAllFallback, CatchAllProbe, CatchAllVerdict, MailboxProbe,
    ProbeOptions, ProbeOutcome, ServerAttempt, SmtpEvent, SmtpReply, detect_catch_all,
    is_command_argument, probe_mailbox,
};
pub use validator::{
    NormalizedEmail, ValidationMode, ValidationReport, check_syntax, normalize_email,
    validate_email,
};
pub use verify::{
    Reason, VerificationReport, VerificationResult, VerifyError, VerifyOptions, verify,
    verify_with_options,
};

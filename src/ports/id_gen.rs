//! ID generator port for producing fresh identifiers.

/// Produces candidate identifiers for newly created guests and sessions.
///
/// Output is not trusted: the identity manager normalizes every generated
/// value and substitutes a library UUID when the candidate is malformed.
pub trait IdGenerator: Send + Sync {
    /// Generates a new candidate identifier string.
    fn generate_id(&self) -> String;
}

//! `eco ids` command.

use crate::context::SessionContext;
use crate::identity::IdentityPair;

/// Prints the guest and session identifiers, creating them if needed.
///
/// # Errors
///
/// Never fails today; the signature matches the other handlers.
pub fn run(ctx: &SessionContext) -> Result<(), String> {
    print_pair(&ctx.identity.ensure_guest_and_session());
    Ok(())
}

pub(crate) fn print_pair(pair: &IdentityPair) {
    println!("guest_id    {}", pair.guest_id);
    println!("session_id  {}", pair.session_id);
}

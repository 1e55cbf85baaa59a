//! `eco remember` command.

use super::ids::print_pair;
use crate::context::SessionContext;
use crate::identity::{Identifier, IdentityKind};

/// Adopts the given identifiers, then prints the current pair.
///
/// Invalid candidates are reported and skipped; the previous identifier stays.
///
/// # Errors
///
/// Returns an error string if neither identifier was given.
pub fn run(ctx: &SessionContext, guest: Option<&str>, session: Option<&str>) -> Result<(), String> {
    if guest.is_none() && session.is_none() {
        return Err("Nothing to remember: pass --guest and/or --session".to_string());
    }

    if let Some(candidate) = guest {
        report(IdentityKind::Guest, candidate, ctx.identity.remember_guest_id(candidate));
    }
    if let Some(candidate) = session {
        report(IdentityKind::Session, candidate, ctx.identity.remember_session_id(candidate));
    }

    print_pair(&ctx.identity.ensure_guest_and_session());
    Ok(())
}

fn report(kind: IdentityKind, candidate: &str, adopted: Option<Identifier>) {
    match adopted {
        Some(id) => println!("adopted {} id {id}", kind.as_str()),
        None => println!("ignored invalid {} id {candidate:?}", kind.as_str()),
    }
}

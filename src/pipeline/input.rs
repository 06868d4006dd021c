//! Input resolution: turn the invocation arguments into an entry id.
//!
//! Only the first argument is considered. It must parse as a positive
//! 32-bit integer, which is the range of repository entry ids.

use crate::error::PageGenError;
use tracing::{debug, warn};

/// Extract the entry id from the positional arguments (program name
/// already stripped).
pub fn resolve_entry_id<S: AsRef<str>>(args: &[S]) -> Result<i32, PageGenError> {
    let first = args.first().ok_or(PageGenError::MissingArgument)?;
    if args.len() > 1 {
        warn!("Ignoring {} extra argument(s) after the entry id", args.len() - 1);
    }

    let raw = first.as_ref();
    let id = parse_entry_id(raw).ok_or_else(|| PageGenError::InvalidArgument {
        input: raw.to_string(),
    })?;
    debug!("Resolved entry id {}", id);
    Ok(id)
}

fn parse_entry_id(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_is_missing() {
        let args: [&str; 0] = [];
        assert!(matches!(
            resolve_entry_id(&args),
            Err(PageGenError::MissingArgument)
        ));
    }

    #[test]
    fn first_argument_wins() {
        assert_eq!(resolve_entry_id(&["12345", "999"]).unwrap(), 12345);
        assert_eq!(resolve_entry_id(&[" 42 "]).unwrap(), 42);
    }

    #[test]
    fn non_numeric_is_invalid() {
        for bad in ["abc", "", "12a", "1.5", "0", "-7", "2147483648"] {
            match resolve_entry_id(&[bad]) {
                Err(PageGenError::InvalidArgument { input }) => assert_eq!(input, bad),
                other => panic!("{bad:?} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn accepts_owned_strings() {
        let args = vec![String::from("7")];
        assert_eq!(resolve_entry_id(&args).unwrap(), 7);
    }
}

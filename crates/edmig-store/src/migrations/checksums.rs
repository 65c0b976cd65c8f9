//! Migration checksums
//!
//! Every applied migration records the SHA-256 of its SQL so an edited
//! migration file is caught instead of silently diverging from the schema.

use sha2::{Digest, Sha256};

use crate::errors::{checksum_mismatch, Result};

/// Hex SHA-256 of the migration SQL
pub fn compute_checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// Compare the checksum recorded at apply time with the embedded SQL
///
/// Rows written without a checksum are accepted.
pub fn verify_checksum(migration_id: &str, recorded: Option<&str>, sql: &str) -> Result<()> {
    let Some(recorded) = recorded else {
        return Ok(());
    };
    let actual = compute_checksum(sql);
    if recorded != actual {
        return Err(checksum_mismatch(migration_id, recorded, &actual));
    }
    Ok(())
}

//! ============================================================================
//! Pass Encoder - Credential payload formatting and the QR rendering seam
//! ============================================================================
//! The core owns the payload text; the actual QR rasterizer is an external
//! collaborator behind the `PassEncoder` trait (payload in, image bytes out).
//! ============================================================================

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::store::MemberRecord;
use crate::types::TokenId;

/// External QR encoder: opaque payload text in, image bytes out.
///
/// Encoder failures are fatal to the single operation that triggered them;
/// there is no retry or backoff.
pub trait PassEncoder: Send + Sync {
    fn encode(&self, payload: &str) -> Result<Vec<u8>>;
}

/// Four-line member credential payload: ID, full name, vehicle-or-"none",
/// issue date (day.month.year). Re-derived from current record state on
/// every issuance.
pub fn member_payload(member: &MemberRecord, issued_at: DateTime<Utc>) -> String {
    format!(
        "ID: {}\nNAME: {}\nVEHICLE: {}\nDATE: {}",
        member.token_id,
        member.full_name,
        member.vehicle.as_deref().unwrap_or("none"),
        issued_at.format("%d.%m.%Y")
    )
}

/// Single-line guest pass payload.
pub fn guest_payload(token_id: TokenId) -> String {
    format!("TEMP PASS ID: {}", token_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;
    use chrono::TimeZone;

    #[test]
    fn test_member_payload_four_lines() {
        let mut member = testkit::member(100, "Ivanov Ivan Ivanovich", 1234567890);
        member.vehicle = Some("A123BC".to_string());
        let issued = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();

        let payload = member_payload(&member, issued);
        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "ID: 1234567890");
        assert_eq!(lines[1], "NAME: Ivanov Ivan Ivanovich");
        assert_eq!(lines[2], "VEHICLE: A123BC");
        assert_eq!(lines[3], "DATE: 07.03.2024");
    }

    #[test]
    fn test_member_payload_without_vehicle() {
        let member = testkit::member(100, "Ivanov Ivan Ivanovich", 42);
        let issued = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();

        let payload = member_payload(&member, issued);
        assert!(payload.contains("VEHICLE: none"));
        assert!(payload.ends_with("DATE: 31.12.2024"));
    }

    #[test]
    fn test_guest_payload() {
        assert_eq!(guest_payload(987654321), "TEMP PASS ID: 987654321");
    }
}

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Enregistrement horodaté par la sonde
pub trait Timestamped {
    fn ts(&self) -> &str;

    fn instant(&self) -> Option<OffsetDateTime> {
        parse_ts(self.ts())
    }
}

/// Parse un horodatage ISO-8601 avec offset numérique.
///
/// Les sondes écrivent parfois l'offset sans deux-points (`+0000`) : on insère
/// le séparateur puis on re-parse. `None` si toujours invalide.
pub fn parse_ts(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let fixed = insert_offset_colon(raw)?;
    OffsetDateTime::parse(&fixed, &Rfc3339).ok()
}

/// "...+0530" -> "...+05:30"
fn insert_offset_colon(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    if bytes.len() < 5 {
        return None;
    }
    let split = bytes.len() - 5;
    let (head, tail) = raw.split_at(split);
    let tail = tail.as_bytes();
    if !matches!(tail[0], b'+' | b'-') || !tail[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(format!(
        "{head}{}{}:{}",
        tail[0] as char,
        std::str::from_utf8(&tail[1..3]).ok()?,
        std::str::from_utf8(&tail[3..5]).ok()?
    ))
}

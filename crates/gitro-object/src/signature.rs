use bstr::{BStr, BString, ByteSlice, ByteVec};

use crate::ObjectError;

/// A point in time as git records it: seconds since the epoch plus the
/// author's timezone offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitTime {
    /// Seconds since Unix epoch.
    pub seconds: i64,
    /// Timezone offset in minutes from UTC (e.g., -300 for -0500).
    pub offset_minutes: i32,
}

impl GitTime {
    /// Parse the raw trailing portion of a signature: `"<seconds> <±HHMM>"`.
    pub fn parse(input: &str) -> Result<Self, ObjectError> {
        let input = input.trim();
        let mut parts = input.splitn(2, ' ');

        let seconds_str = parts.next().unwrap_or("");
        let seconds: i64 = seconds_str
            .parse()
            .map_err(|_| ObjectError::InvalidSignature(format!("invalid timestamp: '{seconds_str}'")))?;

        let offset_minutes = match parts.next() {
            Some(tz_str) => {
                let tz_str = tz_str.trim();
                // The zone is the decimal ±HHMM form: -0500 parses as -500.
                let tz: i32 = tz_str.parse().map_err(|_| {
                    ObjectError::InvalidSignature(format!("invalid timezone: '{tz_str}'"))
                })?;
                let sign = if tz < 0 { -1 } else { 1 };
                let abs = tz.unsigned_abs() as i32;
                sign * ((abs / 100) * 60 + abs % 100)
            }
            None => 0,
        };

        Ok(Self {
            seconds,
            offset_minutes,
        })
    }

    /// Render as `"<seconds> <±HHMM>"`.
    pub fn to_bytes(&self) -> BString {
        let sign = if self.offset_minutes < 0 { -1 } else { 1 };
        let abs = self.offset_minutes.unsigned_abs() as i32;
        let tz = sign * ((abs / 60) * 100 + abs % 60);
        BString::from(format!("{} {:+05}", self.seconds, tz))
    }
}

/// An identity line: `Name <email> timestamp tz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub time: GitTime,
}

impl Signature {
    /// Parse from git format, e.g. `"John Doe <john@example.com> 1234567890 +0000"`.
    pub fn parse(input: &BStr) -> Result<Self, ObjectError> {
        let input = input.as_bytes();

        // Split off the date portion at the last '>'.
        let gt_pos = input
            .iter()
            .rposition(|&b| b == b'>')
            .ok_or_else(|| ObjectError::InvalidSignature("missing '>' in signature".into()))?;

        let lt_pos = input[..gt_pos]
            .iter()
            .rposition(|&b| b == b'<')
            .ok_or_else(|| ObjectError::InvalidSignature("missing '<' in signature".into()))?;

        let name = input[..lt_pos].trim();
        let email = &input[lt_pos + 1..gt_pos];

        let time_str = input[gt_pos + 1..].trim();
        let time_str = std::str::from_utf8(time_str)
            .map_err(|_| ObjectError::InvalidSignature("non-UTF-8 date in signature".into()))?;
        let time = GitTime::parse(time_str)?;

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            time,
        })
    }

    /// Format in git's canonical form: `Name <email> timestamp tz`.
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::new(Vec::new());
        out.push_str(&self.name);
        out.push_str(b" <");
        out.push_str(&self.email);
        out.push_str(b"> ");
        out.push_str(self.time.to_bytes());
        out
    }
}

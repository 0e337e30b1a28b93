use bstr::{BStr, BString, ByteSlice};
use gitro_hash::ObjectId;

use crate::signature::Signature;
use crate::{ObjectError, ObjectType};

/// A git annotated tag object.
///
/// A tag normally names a single object, but repeated `object` headers are
/// accepted and all targets are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// OIDs of the tagged object(s); at least one.
    pub targets: Vec<ObjectId>,
    /// Type of the tagged object.
    pub target_type: ObjectType,
    /// Tag name.
    pub tag_name: BString,
    /// Tagger identity and timestamp (absent on some old tags).
    pub tagger: Option<Signature>,
    /// Tag message.
    pub message: BString,
}

impl Tag {
    /// Parse tag content from raw bytes (no object header).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut targets: Vec<ObjectId> = Vec::new();
        let mut target_type: Option<ObjectType> = None;
        let mut tag_name: Option<BString> = None;
        let mut tagger: Option<Signature> = None;

        let data = content;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }
            if data[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];

            if let Some(space_pos) = line.iter().position(|&b| b == b' ') {
                let key = &line[..space_pos];
                let value = &line[space_pos + 1..];

                match key {
                    b"object" => {
                        let hex = std::str::from_utf8(value).map_err(|_| {
                            ObjectError::InvalidHeader("non-UTF8 target OID".into())
                        })?;
                        targets.push(ObjectId::from_hex(hex)?);
                    }
                    b"type" => {
                        target_type = Some(ObjectType::from_bytes(value)?);
                    }
                    b"tag" => {
                        tag_name = Some(BString::from(value));
                    }
                    b"tagger" => {
                        tagger = Some(Signature::parse(BStr::new(value))?);
                    }
                    _ => {
                        // Unknown tag headers are skipped.
                    }
                }
            }

            pos = line_end + 1;
        }

        if targets.is_empty() {
            return Err(ObjectError::MissingTagField { field: "object" });
        }
        let target_type = target_type.ok_or(ObjectError::MissingTagField { field: "type" })?;
        let tag_name = tag_name.ok_or(ObjectError::MissingTagField { field: "tag" })?;

        let message = BString::from(&data[pos.min(data.len())..]);

        Ok(Self {
            targets,
            target_type,
            tag_name,
            tagger,
            message,
        })
    }

    /// Serialize tag content to bytes (no object header).
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for target in &self.targets {
            out.extend_from_slice(b"object ");
            out.extend_from_slice(target.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"type ");
        out.extend_from_slice(self.target_type.as_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"tag ");
        out.extend_from_slice(&self.tag_name);
        out.push(b'\n');

        if let Some(ref tagger) = self.tagger {
            out.extend_from_slice(b"tagger ");
            out.extend_from_slice(&tagger.to_bytes());
            out.push(b'\n');
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);

        out
    }

    /// The primary target (first `object` header).
    pub fn target(&self) -> ObjectId {
        self.targets[0]
    }

    /// The summary: first line of the message.
    pub fn summary(&self) -> &BStr {
        let msg: &[u8] = self.message.as_ref();
        match msg.find_byte(b'\n') {
            Some(pos) => BStr::new(&msg[..pos]),
            None => BStr::new(msg),
        }
    }

    /// The detail: everything after the summary line (None for one-liners).
    pub fn detail(&self) -> Option<&BStr> {
        let msg: &[u8] = self.message.as_ref();
        msg.find_byte(b'\n').map(|pos| BStr::new(&msg[pos + 1..]))
    }
}

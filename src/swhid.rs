use std::fmt;
use std::str::FromStr;
use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, CONTROLS};
use serde::{Serialize, Deserialize};
use crate::error::SwhidError;
use crate::id::ObjectId;

/// Characters that cannot appear verbatim in a qualifier value.
///
/// `=` and `&` stay as they are, so origin query strings remain readable:
/// qualifiers are split on their first `=` only.
const QUALIFIER_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b';').add(b'?').add(b'#');

/// Software Heritage object types (Core SWHID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Content,
    Directory,
    Revision,
    Release,
    Snapshot,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Content => "cnt",
            ObjectType::Directory => "dir",
            ObjectType::Revision => "rev",
            ObjectType::Release => "rel",
            ObjectType::Snapshot => "snp",
        }
    }

    /// Long name, as used in browse URLs and archive records
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Content => "content",
            ObjectType::Directory => "directory",
            ObjectType::Revision => "revision",
            ObjectType::Release => "release",
            ObjectType::Snapshot => "snapshot",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, SwhidError> {
        match s {
            "cnt" => Ok(ObjectType::Content),
            "dir" => Ok(ObjectType::Directory),
            "rev" => Ok(ObjectType::Revision),
            "rel" => Ok(ObjectType::Release),
            "snp" => Ok(ObjectType::Snapshot),
            _ => Err(SwhidError::InvalidObjectType(s.to_string())),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Percent-encode a qualifier value so it can be embedded in a SWHID.
pub fn escape_qualifier(value: &[u8]) -> String {
    percent_encode(value, QUALIFIER_ESCAPE).to_string()
}

/// Core Software Heritage Identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swhid {
    object_type: ObjectType,
    object_id: ObjectId,
}

/// Qualified Software Heritage Identifier
///
/// Qualifier values are stored decoded; escaping happens on display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedSwhid {
    core: Swhid,
    origin: Option<String>,
    visit: Option<Swhid>,
    anchor: Option<Swhid>,
    path: Option<Vec<u8>>,
    lines: Option<(u32, Option<u32>)>,
}

impl Swhid {
    pub const NAMESPACE: &'static str = "swh";
    pub const SCHEME_VERSION: u32 = 1;

    pub fn new(object_type: ObjectType, object_id: ObjectId) -> Self {
        Self { object_type, object_id }
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    /// Convert to Qualified SWHID
    pub fn to_qualified(&self) -> QualifiedSwhid {
        QualifiedSwhid::new(self.object_type, self.object_id)
    }

    /// Parse SWHID from string
    pub fn from_string(s: &str) -> Result<Self, SwhidError> {
        let parts: Vec<&str> = s.split(':').collect();

        if parts.len() != 4 {
            return Err(SwhidError::InvalidFormat(format!(
                "SWHID must have 4 parts, got {}: {}",
                parts.len(), s
            )));
        }

        if parts[0] != Self::NAMESPACE {
            return Err(SwhidError::InvalidNamespace(parts[0].to_string()));
        }

        let scheme_version = parts[1].parse::<u32>()
            .map_err(|_| SwhidError::InvalidVersion(parts[1].to_string()))?;
        if scheme_version != Self::SCHEME_VERSION {
            return Err(SwhidError::InvalidVersion(parts[1].to_string()));
        }

        let object_type = ObjectType::from_str(parts[2])?;
        let object_id = ObjectId::from_hex(parts[3])?;

        Ok(Self { object_type, object_id })
    }
}

impl QualifiedSwhid {
    pub fn new(object_type: ObjectType, object_id: ObjectId) -> Self {
        Self {
            core: Swhid::new(object_type, object_id),
            origin: None,
            visit: None,
            anchor: None,
            path: None,
            lines: None,
        }
    }

    pub fn with_origin(mut self, origin: String) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_visit(mut self, visit: Swhid) -> Self {
        self.visit = Some(visit);
        self
    }

    pub fn with_anchor(mut self, anchor: Swhid) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_path(mut self, path: Vec<u8>) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_lines(mut self, start: u32, end: Option<u32>) -> Self {
        self.lines = Some((start, end));
        self
    }

    pub fn core(&self) -> &Swhid {
        &self.core
    }

    pub fn object_type(&self) -> ObjectType {
        self.core.object_type
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.core.object_id
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn visit(&self) -> Option<&Swhid> {
        self.visit.as_ref()
    }

    pub fn anchor(&self) -> Option<&Swhid> {
        self.anchor.as_ref()
    }

    pub fn path(&self) -> Option<&[u8]> {
        self.path.as_deref()
    }

    pub fn lines(&self) -> Option<(u32, Option<u32>)> {
        self.lines
    }

    pub fn has_qualifiers(&self) -> bool {
        self.origin.is_some()
            || self.visit.is_some()
            || self.anchor.is_some()
            || self.path.is_some()
            || self.lines.is_some()
    }

    /// Parse Qualified SWHID from string
    pub fn from_string(s: &str) -> Result<Self, SwhidError> {
        let mut parts = s.split(';');
        let core = match parts.next() {
            Some(core) if !core.is_empty() => Swhid::from_string(core)?,
            _ => return Err(SwhidError::InvalidFormat("Empty SWHID string".to_string())),
        };

        let mut qualified = core.to_qualified();

        for qualifier in parts {
            let (key, value) = qualifier.split_once('=').ok_or_else(|| {
                SwhidError::InvalidQualifier(qualifier.to_string())
            })?;

            match key {
                "origin" => {
                    let origin = percent_decode_str(value)
                        .decode_utf8()
                        .map_err(|_| SwhidError::InvalidQualifierValue(value.to_string()))?;
                    qualified.origin = Some(origin.into_owned());
                }
                "visit" => {
                    let visit = Swhid::from_string(value)?;
                    if visit.object_type() != ObjectType::Snapshot {
                        return Err(SwhidError::InvalidQualifierValue(format!(
                            "visit must be a snapshot SWHID: {}", value
                        )));
                    }
                    qualified.visit = Some(visit);
                }
                "anchor" => {
                    let anchor = Swhid::from_string(value)?;
                    if anchor.object_type() == ObjectType::Content {
                        return Err(SwhidError::InvalidQualifierValue(format!(
                            "anchor cannot be a content SWHID: {}", value
                        )));
                    }
                    qualified.anchor = Some(anchor);
                }
                "path" => {
                    qualified.path = Some(percent_decode_str(value).collect());
                }
                "lines" => {
                    qualified.lines = Some(parse_lines(value)?);
                }
                _ => return Err(SwhidError::UnknownQualifier(key.to_string())),
            }
        }

        Ok(qualified)
    }
}

/// Parse a `lines` qualifier value, `START` or `START-END`.
pub fn parse_lines(value: &str) -> Result<(u32, Option<u32>), SwhidError> {
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| SwhidError::InvalidQualifierValue(format!("Invalid lines: {}", value)))
    };
    match value.split_once('-') {
        Some((start, end)) => Ok((parse(start)?, Some(parse(end)?))),
        None => Ok((parse(value)?, None)),
    }
}

impl FromStr for Swhid {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl FromStr for QualifiedSwhid {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for Swhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}",
            Self::NAMESPACE,
            Self::SCHEME_VERSION,
            self.object_type,
            self.object_id
        )
    }
}

impl fmt::Display for QualifiedSwhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.core)?;

        // Qualifiers in the canonical order: origin, visit, anchor, path, lines
        if let Some(ref origin) = self.origin {
            write!(f, ";origin={}", escape_qualifier(origin.as_bytes()))?;
        }

        if let Some(ref visit) = self.visit {
            write!(f, ";visit={}", visit)?;
        }

        if let Some(ref anchor) = self.anchor {
            write!(f, ";anchor={}", anchor)?;
        }

        if let Some(ref path) = self.path {
            write!(f, ";path={}", escape_qualifier(path))?;
        }

        if let Some((start, end)) = self.lines {
            match end {
                Some(end) => write!(f, ";lines={}-{}", start, end)?,
                None => write!(f, ";lines={}", start)?,
            }
        }

        Ok(())
    }
}

//! Lua string type with SSO (Small String Optimization) and interning.
//!
//! Every string is interned, so two `StringId`s are equal iff the bytes are.
//! Short strings (<=40 bytes) are stored inline; long strings on the heap.
use std::collections::HashMap;
use std::fmt;

/// Maximum bytes for inline (short) string storage.
const SSO_MAX: usize = 40;

/// An opaque handle to a string in the interner.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StringId(pub u32);

#[derive(Clone)]
enum StringData {
    Short { buf: [u8; SSO_MAX], len: u8 },
    Long(Box<[u8]>),
}

/// An interned Lua string.
#[derive(Clone)]
pub struct TString {
    data: StringData,
}

impl TString {
    fn new(bytes: &[u8]) -> Self {
        let data = if bytes.len() <= SSO_MAX {
            let mut buf = [0u8; SSO_MAX];
            buf[..bytes.len()].copy_from_slice(bytes);
            StringData::Short {
                buf,
                len: bytes.len() as u8,
            }
        } else {
            StringData::Long(bytes.into())
        };
        TString { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            StringData::Short { buf, len } => &buf[..*len as usize],
            StringData::Long(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_short(&self) -> bool {
        matches!(&self.data, StringData::Short { .. })
    }

    /// The string as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }
}

impl fmt::Debug for TString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "\"{}\"", s),
            None => write!(f, "<binary string len={}>", self.len()),
        }
    }
}

/// PUC Lua compatible hash function (luaS_hash algorithm).
pub fn lua_hash(bytes: &[u8]) -> u32 {
    let len = bytes.len();
    let mut h = len as u32;
    // Long strings only hash every `step`-th byte
    let step = (len >> 5) + 1;
    let mut i = len;
    while i >= step {
        h ^= (h << 5).wrapping_add(h >> 2).wrapping_add(bytes[i - 1] as u32);
        i -= step;
    }
    h
}

/// String interner: owns all strings and deduplicates by content.
#[derive(Debug, Default)]
pub struct StringInterner {
    strings: Vec<TString>,
    /// hash → ids sharing that hash.
    lookup: HashMap<u32, Vec<u32>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string. Returns the existing StringId if already present.
    pub fn intern(&mut self, bytes: &[u8]) -> StringId {
        if let Some(id) = self.find(bytes) {
            return id;
        }
        let hash = lua_hash(bytes);
        let id = self.strings.len() as u32;
        self.strings.push(TString::new(bytes));
        self.lookup.entry(hash).or_default().push(id);
        StringId(id)
    }

    /// Look up a string without interning it.
    pub fn find(&self, bytes: &[u8]) -> Option<StringId> {
        let ids = self.lookup.get(&lua_hash(bytes))?;
        ids.iter()
            .copied()
            .find(|&id| self.strings[id as usize].as_bytes() == bytes)
            .map(StringId)
    }

    pub fn get(&self, id: StringId) -> &TString {
        &self.strings[id.0 as usize]
    }

    pub fn get_bytes(&self, id: StringId) -> &[u8] {
        self.strings[id.0 as usize].as_bytes()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

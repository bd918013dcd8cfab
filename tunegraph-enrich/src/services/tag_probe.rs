//! Embedded tag probe
//!
//! Reads identifiers from a file's own tags using lofty. Tagging tools
//! disagree on key names and capitalization (`MUSICBRAINZ_TRACKID`,
//! `MusicBrainz Track Id`, iTunes freeform atoms...), so every tag item is
//! folded into one case-insensitive map and each field is looked up through an
//! ordered list of candidate keys. The lists are plain data in [`TagKeys`].

use crate::types::{FileTags, ProviderError, ProviderResult, TagProbe};
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, Tag};
use std::collections::HashMap;
use std::path::Path;

/// Ordered candidate keys (lowercase) for each extracted field
#[derive(Debug, Clone)]
pub struct TagKeys {
    pub recording_mbid: &'static [&'static str],
    pub artist_mbid: &'static [&'static str],
    pub artist_name: &'static [&'static str],
    pub acoustid_id: &'static [&'static str],
}

impl TagKeys {
    pub const DEFAULT: TagKeys = TagKeys {
        recording_mbid: &[
            "musicbrainz_trackid",
            "musicbrainzrecordingid",
            "musicbrainz track id",
            "musicbrainz_recordingid",
            "musicbrainz recording id",
            "----:com.apple.itunes:musicbrainz track id",
        ],
        artist_mbid: &[
            "musicbrainz_artistid",
            "musicbrainzartistid",
            "musicbrainz artist id",
            "----:com.apple.itunes:musicbrainz artist id",
        ],
        artist_name: &[
            "artist",
            "trackartist",
            "tpe1",
            "©art",
            "albumartist",
            "album artist",
            "album_artist",
        ],
        acoustid_id: &[
            "acoustid_id",
            "acoustid id",
            "----:com.apple.itunes:acoustid id",
        ],
    };
}

impl Default for TagKeys {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Validate MusicBrainz identifier shape (hyphenated UUID)
pub fn is_valid_mbid(mbid: &str) -> bool {
    mbid.len() == 36 && uuid::Uuid::parse_str(mbid).is_ok()
}

/// First non-empty component of a possibly multi-valued tag
fn first_value(raw: &str, separators: &[char]) -> Option<String> {
    raw.split(|c| separators.contains(&c))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Look up the first candidate key holding a usable value
fn lookup(
    map: &HashMap<String, String>,
    candidates: &[&str],
    separators: &[char],
    valid: impl Fn(&str) -> bool,
) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| map.get(*key))
        .filter_map(|raw| first_value(raw, separators))
        .find(|value| valid(value))
}

/// Resolve identifiers from a case-insensitive tag map
///
/// Map keys must already be lowercase. Identifier fields accept `/`, `;` and
/// NUL as multi-value separators; artist names only `;` and NUL, so that
/// names like "AC/DC" survive.
pub fn resolve_tags(map: &HashMap<String, String>, keys: &TagKeys) -> FileTags {
    const ID_SEPARATORS: &[char] = &['/', ';', '\0'];
    const NAME_SEPARATORS: &[char] = &[';', '\0'];

    FileTags {
        recording_mbid: lookup(map, keys.recording_mbid, ID_SEPARATORS, |v| is_valid_mbid(&v.to_lowercase()))
            .map(|v| v.to_lowercase()),
        artist_mbid: lookup(map, keys.artist_mbid, ID_SEPARATORS, |v| is_valid_mbid(&v.to_lowercase()))
            .map(|v| v.to_lowercase()),
        artist_name: lookup(map, keys.artist_name, NAME_SEPARATORS, |_| true),
        acoustid_id: lookup(map, keys.acoustid_id, ID_SEPARATORS, |v| is_valid_mbid(&v.to_lowercase()))
            .map(|v| v.to_lowercase()),
    }
}

/// Fold one lofty tag into the map; earlier entries win
fn add_tag_items(map: &mut HashMap<String, String>, tag: &Tag) {
    for item in tag.items() {
        let value = match item.value() {
            ItemValue::Text(text) | ItemValue::Locator(text) => text.as_str(),
            ItemValue::Binary(_) => continue,
        };

        let mut names: Vec<String> = Vec::with_capacity(2);
        if let Some(native) = item.key().map_key(tag.tag_type(), true) {
            names.push(native.to_lowercase());
        }
        if let ItemKey::Unknown(raw) = item.key() {
            names.push(raw.to_lowercase());
        } else {
            // Generic lofty name, e.g. "MusicBrainzRecordingId"
            names.push(format!("{:?}", item.key()).to_lowercase());
        }

        for name in names {
            map.entry(name).or_insert_with(|| value.to_string());
        }
    }
}

/// Tag probe backed by lofty
#[derive(Debug, Clone, Default)]
pub struct LoftyTagProbe {
    keys: TagKeys,
}

impl LoftyTagProbe {
    pub fn new(keys: TagKeys) -> Self {
        Self { keys }
    }

    /// Every tag item of the file keyed by lowercase name
    pub fn read_tag_map(&self, path: &Path) -> ProviderResult<HashMap<String, String>> {
        if !path.exists() {
            return Err(ProviderError::Io(format!("file not found: {}", path.display())));
        }

        let tagged_file = Probe::open(path)
            .map_err(|e| ProviderError::Io(e.to_string()))?
            .read()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let mut map = HashMap::new();
        // Primary tag first so its values take precedence
        if let Some(tag) = tagged_file.primary_tag() {
            add_tag_items(&mut map, tag);
        }
        for tag in tagged_file.tags() {
            add_tag_items(&mut map, tag);
        }

        Ok(map)
    }
}

impl TagProbe for LoftyTagProbe {
    fn read_tags(&self, path: &Path) -> ProviderResult<FileTags> {
        let map = self.read_tag_map(path)?;
        Ok(resolve_tags(&map, &self.keys))
    }
}

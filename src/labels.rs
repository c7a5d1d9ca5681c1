//! Label tables mapping class IDs from the model's output vector to
//! human-readable strings.
//!
//! Two table shapes exist: a flat newline-delimited file for retrained
//! classifiers, and the ImageNet pair of mapping files joined through
//! synset IDs, with an optional localized overlay.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("failed to read label file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed line {line} in {path}: {text:?}")]
    Parse {
        path: PathBuf,
        line: usize,
        text: String,
    },
    #[error("synset {synset} referenced by the label map has no human-readable name")]
    UnresolvedSynset { synset: String },
    #[error("synset {synset} has no entry in the localized label map")]
    UnresolvedOverride { synset: String },
}

fn read_to_string(path: &Path) -> Result<String, LabelError> {
    fs::read_to_string(path).map_err(|source| LabelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a flat labels file, one label per class ID in output order.
pub fn load_flat_labels(path: &Path) -> Result<Vec<String>, LabelError> {
    let text = read_to_string(path)?;
    Ok(text.lines().map(|line| line.trim_end().to_string()).collect())
}

/// An entry is displayed as `localized[name]` when a localized overlay was
/// loaded, or plainly as `name` otherwise.
#[derive(Clone, Debug)]
struct DisplayEntry {
    name: String,
    localized: Option<String>,
}

/// Read-only class ID -> display string table for ImageNet-style models.
#[derive(Debug, Default)]
pub struct NodeLookup {
    entries: HashMap<usize, DisplayEntry>,
}

impl NodeLookup {
    /// Builds the table from a label-map protobuf text file (class ID ->
    /// synset), a synset -> human string file, and an optional localized
    /// synset -> string file layered on top.
    ///
    /// Every synset named by the label map must resolve in the synset map.
    /// When a localized map is given, it must cover those synsets too;
    /// partial overlays fail construction rather than silently mixing
    /// languages.
    pub fn load(
        label_map_path: &Path,
        synset_map_path: &Path,
        localized_map_path: Option<&Path>,
    ) -> Result<Self, LabelError> {
        let id_to_synset = parse_label_map(&read_to_string(label_map_path)?, label_map_path)?;
        let synset_to_human = parse_synset_map(&read_to_string(synset_map_path)?, synset_map_path)?;
        let localized = localized_map_path
            .map(|path| parse_synset_map(&read_to_string(path)?, path))
            .transpose()?;

        Self::build(id_to_synset, synset_to_human, localized)
    }

    fn build(
        id_to_synset: HashMap<usize, String>,
        synset_to_human: HashMap<String, String>,
        localized: Option<HashMap<String, String>>,
    ) -> Result<Self, LabelError> {
        let mut entries = HashMap::with_capacity(id_to_synset.len());
        for (class_id, synset) in id_to_synset {
            let name = synset_to_human
                .get(&synset)
                .ok_or_else(|| LabelError::UnresolvedSynset {
                    synset: synset.clone(),
                })?
                .clone();
            let localized = match &localized {
                Some(table) => Some(
                    table
                        .get(&synset)
                        .ok_or_else(|| LabelError::UnresolvedOverride {
                            synset: synset.clone(),
                        })?
                        .clone(),
                ),
                None => None,
            };
            entries.insert(class_id, DisplayEntry { name, localized });
        }
        Ok(Self { entries })
    }

    /// Display string for a class ID, or an empty string when the ID is
    /// unknown to the table. A lookup miss at this point is tolerated; only
    /// table construction is fail-fast.
    pub fn display_name(&self, class_id: usize) -> String {
        match self.entries.get(&class_id) {
            Some(DisplayEntry {
                name,
                localized: Some(localized),
            }) => format!("{localized}[{name}]"),
            Some(DisplayEntry { name, .. }) => name.clone(),
            None => String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses the label-map protobuf text format: repeated entries carrying a
/// `target_class:` integer line followed by a `target_class_string:` quoted
/// synset line.
fn parse_label_map(text: &str, path: &Path) -> Result<HashMap<usize, String>, LabelError> {
    let mut table = HashMap::new();
    let mut pending_class: Option<usize> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if let Some(value) = line.strip_prefix("target_class:") {
            let class_id = value.trim().parse::<usize>().map_err(|_| LabelError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                text: raw.to_string(),
            })?;
            pending_class = Some(class_id);
        } else if let Some(value) = line.strip_prefix("target_class_string:") {
            let class_id = pending_class.take().ok_or_else(|| LabelError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                text: raw.to_string(),
            })?;
            let synset = value.trim().trim_matches('"').to_string();
            table.insert(class_id, synset);
        }
    }

    Ok(table)
}

/// Parses `synset<whitespace>human string` lines. Blank lines are skipped;
/// a line without a name field is malformed.
fn parse_synset_map(text: &str, path: &Path) -> Result<HashMap<String, String>, LabelError> {
    let mut table = HashMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }
        let (synset, name) = line.split_once(char::is_whitespace).ok_or_else(|| {
            LabelError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                text: raw.to_string(),
            }
        })?;
        table.insert(synset.to_string(), name.trim().to_string());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_label_map_entries() {
        let text = "entry {\n  target_class: 449\n  target_class_string: \"n01440764\"\n}\nentry {\n  target_class: 450\n  target_class_string: \"n01443537\"\n}\n";
        let table = parse_label_map(text, Path::new("label_map.pbtxt")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[&449], "n01440764");
        assert_eq!(table[&450], "n01443537");
    }

    #[test]
    fn label_map_rejects_non_numeric_class() {
        let text = "target_class: not-a-number\n";
        let err = parse_label_map(text, Path::new("bad.pbtxt")).unwrap_err();
        assert!(matches!(err, LabelError::Parse { line: 1, .. }));
    }

    #[test]
    fn label_map_rejects_string_without_class() {
        let text = "target_class_string: \"n01440764\"\n";
        let err = parse_label_map(text, Path::new("bad.pbtxt")).unwrap_err();
        assert!(matches!(err, LabelError::Parse { .. }));
    }

    #[test]
    fn parses_synset_map_with_tabs_and_commas() {
        let text = "n01440764\ttench, Tinca tinca\nn01443537\tgoldfish, Carassius auratus\n\n";
        let table = parse_synset_map(text, Path::new("synsets.txt")).unwrap();
        assert_eq!(table["n01440764"], "tench, Tinca tinca");
        assert_eq!(table["n01443537"], "goldfish, Carassius auratus");
    }

    #[test]
    fn synset_map_rejects_line_without_name() {
        let err = parse_synset_map("n01440764\n", Path::new("synsets.txt")).unwrap_err();
        assert!(matches!(err, LabelError::Parse { line: 1, .. }));
    }

    #[test]
    fn builds_one_entry_per_class_id() {
        let ids = HashMap::from([(0, "n001".to_string()), (1, "n002".to_string())]);
        let humans = map([("n001", "tench"), ("n002", "goldfish")]);
        let lookup = NodeLookup::build(ids, humans, None).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.display_name(0), "tench");
        assert_eq!(lookup.display_name(1), "goldfish");
    }

    #[test]
    fn localized_overlay_formats_composite_name() {
        let ids = HashMap::from([(1, "n001".to_string())]);
        let humans = map([("n001", "catA_en")]);
        let localized = map([("n001", "catA_cn")]);
        let lookup = NodeLookup::build(ids, humans, Some(localized)).unwrap();
        assert_eq!(lookup.display_name(1), "catA_cn[catA_en]");
    }

    #[test]
    fn unknown_class_id_yields_empty_string() {
        let ids = HashMap::from([(1, "n001".to_string())]);
        let humans = map([("n001", "catA_en")]);
        let lookup = NodeLookup::build(ids, humans, None).unwrap();
        assert_eq!(lookup.display_name(2), "");
    }

    #[test]
    fn missing_synset_in_human_map_is_fatal() {
        let ids = HashMap::from([(1, "n001".to_string())]);
        let err = NodeLookup::build(ids, HashMap::new(), None).unwrap_err();
        assert!(matches!(err, LabelError::UnresolvedSynset { synset } if synset == "n001"));
    }

    #[test]
    fn partial_localized_overlay_is_fatal() {
        let ids = HashMap::from([(1, "n001".to_string()), (2, "n002".to_string())]);
        let humans = map([("n001", "a"), ("n002", "b")]);
        let localized = map([("n001", "a_cn")]);
        let err = NodeLookup::build(ids, humans, Some(localized)).unwrap_err();
        assert!(matches!(err, LabelError::UnresolvedOverride { synset } if synset == "n002"));
    }

    #[test]
    fn load_reads_fixture_files() {
        let dir = std::env::temp_dir().join("image-classify-labels-load-test");
        fs::create_dir_all(&dir).unwrap();
        let label_map = dir.join("label_map.pbtxt");
        let synsets = dir.join("synsets.txt");
        fs::write(
            &label_map,
            "entry {\n  target_class: 1\n  target_class_string: \"n001\"\n}\n",
        )
        .unwrap();
        fs::write(&synsets, "n001\ttench\n").unwrap();

        let lookup = NodeLookup::load(&label_map, &synsets, None).unwrap();
        assert_eq!(lookup.display_name(1), "tench");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_reports_missing_file() {
        let err = NodeLookup::load(
            Path::new("/nonexistent/label_map.pbtxt"),
            Path::new("/nonexistent/synsets.txt"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LabelError::Io { .. }));
    }

    #[test]
    fn flat_labels_keep_output_order() {
        let dir = std::env::temp_dir().join("image-classify-flat-labels-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labels.txt");
        fs::write(&path, "daisy\ndandelion\nroses\n").unwrap();
        assert_eq!(
            load_flat_labels(&path).unwrap(),
            vec!["daisy", "dandelion", "roses"]
        );
        fs::remove_dir_all(&dir).unwrap();
    }
}

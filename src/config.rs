use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Annotation granularity a classifier predicts
///
/// Each level fixes the tile geometry and the set of output classes:
/// - `RootSegm`: coarse colonization, 62 px tiles, three mutually
///   exclusive classes (colonized / non-colonized / background)
/// - `IRStruct`: intraradical structures, 126 px tiles, four independently
///   assessed classes (arbuscules / vesicles / non-colonized / background)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLevel {
    RootSegm,
    IRStruct,
}

impl AnnotationLevel {
    /// Tile edge length (pixels) expected by models at this level
    pub fn tile_edge(self) -> u32 {
        match self {
            AnnotationLevel::RootSegm => 62,
            AnnotationLevel::IRStruct => 126,
        }
    }

    /// Number of output classes
    pub fn class_count(self) -> usize {
        match self {
            AnnotationLevel::RootSegm => 3,
            AnnotationLevel::IRStruct => 4,
        }
    }

    /// Score column names, one per class, in model output order
    pub fn header(self) -> Vec<String> {
        let names: &[&str] = match self {
            // colonized / non-colonized / background
            AnnotationLevel::RootSegm => &["Y", "N", "X"],
            // arbuscules / vesicles / non-colonized / background
            AnnotationLevel::IRStruct => &["A", "V", "N", "X"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Recover the level from a tile edge length, if the edge is one the
    /// pipeline supports
    pub fn from_tile_edge(edge: u32) -> Option<Self> {
        match edge {
            62 => Some(AnnotationLevel::RootSegm),
            126 => Some(AnnotationLevel::IRStruct),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnnotationLevel::RootSegm => "RootSegm",
            AnnotationLevel::IRStruct => "IRStruct",
        }
    }
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnnotationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RootSegm" => Ok(AnnotationLevel::RootSegm),
            "IRStruct" => Ok(AnnotationLevel::IRStruct),
            other => Err(format!("unknown annotation level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Predict,
    Train,
}

/// Immutable per-run configuration
///
/// One value is built at startup and passed by reference into each
/// component. Loading a pre-trained model never mutates an existing
/// configuration; introspection produces a new value via [`with_level`].
///
/// The annotation level is kept as the raw configured string so that an
/// unsupported value stays representable; [`annotation_level`] parses it
/// on demand.
///
/// [`with_level`]: RunConfig::with_level
/// [`annotation_level`]: RunConfig::annotation_level
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_mode: RunMode,
    /// Path to a pre-trained classifier, if one was configured
    pub model: Option<PathBuf>,
    /// Configured annotation level, as given (possibly unsupported)
    pub level: String,
    /// Tile edge length used by the segmentation grid
    pub tile_edge: u32,
    /// Edge length of tiles fed to the model (kept in sync with `tile_edge`)
    pub model_input_size: u32,
    /// Prediction batch size within a tile row
    pub batch_size: usize,
    /// Ordered score column names for the results table
    pub header: Vec<String>,
}

impl RunConfig {
    pub fn new(run_mode: RunMode, model: Option<PathBuf>, level: &str, batch_size: usize) -> Self {
        let parsed = level.parse::<AnnotationLevel>().ok();
        let edge = parsed.map(AnnotationLevel::tile_edge).unwrap_or(0);
        Self {
            run_mode,
            model,
            level: level.to_string(),
            tile_edge: edge,
            model_input_size: edge,
            batch_size,
            header: parsed.map(AnnotationLevel::header).unwrap_or_default(),
        }
    }

    /// The configured annotation level, if it is a supported one
    pub fn annotation_level(&self) -> Option<AnnotationLevel> {
        self.level.parse().ok()
    }

    /// A new configuration consistent with `level`: level name, tile
    /// geometry, and table header all updated together
    pub fn with_level(&self, level: AnnotationLevel) -> Self {
        Self {
            run_mode: self.run_mode,
            model: self.model.clone(),
            level: level.name().to_string(),
            tile_edge: level.tile_edge(),
            model_input_size: level.tile_edge(),
            batch_size: self.batch_size,
            header: level.header(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_from_name() {
        assert_eq!("RootSegm".parse(), Ok(AnnotationLevel::RootSegm));
        assert_eq!("IRStruct".parse(), Ok(AnnotationLevel::IRStruct));
        assert!("AllFeatures".parse::<AnnotationLevel>().is_err());
    }

    #[test]
    fn level_maps_from_tile_edge() {
        assert_eq!(
            AnnotationLevel::from_tile_edge(62),
            Some(AnnotationLevel::RootSegm)
        );
        assert_eq!(
            AnnotationLevel::from_tile_edge(126),
            Some(AnnotationLevel::IRStruct)
        );
        assert_eq!(AnnotationLevel::from_tile_edge(100), None);
    }

    #[test]
    fn config_derives_geometry_from_level() {
        let config = RunConfig::new(RunMode::Predict, None, "IRStruct", 32);
        assert_eq!(config.tile_edge, 126);
        assert_eq!(config.model_input_size, 126);
        assert_eq!(config.header, vec!["A", "V", "N", "X"]);
    }

    #[test]
    fn config_keeps_unsupported_level_representable() {
        let config = RunConfig::new(RunMode::Train, None, "AllFeatures", 32);
        assert_eq!(config.level, "AllFeatures");
        assert_eq!(config.annotation_level(), None);
        assert_eq!(config.tile_edge, 0);
        assert!(config.header.is_empty());
    }

    #[test]
    fn with_level_rebuilds_a_consistent_config() {
        let config = RunConfig::new(RunMode::Predict, None, "RootSegm", 8);
        let updated = config.with_level(AnnotationLevel::IRStruct);
        assert_eq!(updated.level, "IRStruct");
        assert_eq!(updated.tile_edge, 126);
        assert_eq!(updated.header.len(), 4);
        assert_eq!(updated.batch_size, 8);
        // the original value is untouched
        assert_eq!(config.tile_edge, 62);
    }
}

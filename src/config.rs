//! Typed index configuration.
//!
//! An [`IndexSpec`] pins down the four build-time selectors of an
//! index; the canonical on-disk identifier is a pure function of the
//! spec. Query mode (TAAT vs DAAT) is a runtime parameter and is
//! deliberately absent.

use serde::{Deserialize, Serialize};

use crate::error::{QuillError, Result};
use crate::index::RankingModel;

/// Which persistence backend the index is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datastore {
    /// Self-contained JSON record.
    DocumentStore,
    /// SQLite, one table per entity.
    Relational,
}

impl Datastore {
    pub fn code(&self) -> u8 {
        match self {
            Datastore::DocumentStore => 1,
            Datastore::Relational => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Datastore::DocumentStore),
            2 => Ok(Datastore::Relational),
            other => Err(QuillError::config(format!("unknown datastore code {other}"))),
        }
    }
}

/// How postings are compressed at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    None,
    /// Adaptive Elias Gamma/Delta gap encoding.
    Elias,
    /// Deflate over the JSON form, as a library baseline.
    Zlib,
}

impl Compression {
    pub fn code(&self) -> u8 {
        match self {
            Compression::None => 1,
            Compression::Elias => 2,
            Compression::Zlib => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Compression::None),
            2 => Ok(Compression::Elias),
            3 => Ok(Compression::Zlib),
            other => Err(QuillError::config(format!("unknown compression code {other}"))),
        }
    }
}

/// Optional query-processing optimization.
///
/// Skip pointers are build-time (they change the stored index);
/// thresholding and early stopping are runtime heuristics. All three
/// are part of the identifier so experiment runs stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Optimization {
    #[default]
    None,
    SkipPointers,
    Thresholding,
    EarlyStopping,
}

impl Optimization {
    pub fn code(&self) -> &'static str {
        match self {
            Optimization::None => "0",
            Optimization::SkipPointers => "sp",
            Optimization::Thresholding => "th",
            Optimization::EarlyStopping => "es",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "0" => Ok(Optimization::None),
            "sp" => Ok(Optimization::SkipPointers),
            "th" => Ok(Optimization::Thresholding),
            "es" => Ok(Optimization::EarlyStopping),
            other => Err(QuillError::config(format!("unknown optimization code '{other}'"))),
        }
    }
}

/// Default engine name used in identifiers.
pub const DEFAULT_ENGINE: &str = "quill";

/// Full build-time configuration of one index variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub engine: String,
    pub model: RankingModel,
    pub datastore: Datastore,
    pub compression: Compression,
    pub optimization: Optimization,
}

impl IndexSpec {
    /// Create a validated spec.
    pub fn new(
        model: RankingModel,
        datastore: Datastore,
        compression: Compression,
        optimization: Optimization,
    ) -> Result<Self> {
        let spec = IndexSpec {
            engine: DEFAULT_ENGINE.to_string(),
            model,
            datastore,
            compression,
            optimization,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Override the engine name in the identifier.
    pub fn engine<S: Into<String>>(mut self, engine: S) -> Self {
        self.engine = engine.into();
        self
    }

    /// Reject selector combinations the engine does not support.
    ///
    /// Skip pointers accelerate Boolean intersection only; the score
    /// heuristics only make sense where there are scores.
    pub fn validate(&self) -> Result<()> {
        match self.optimization {
            Optimization::SkipPointers if self.model != RankingModel::Boolean => {
                Err(QuillError::config(
                    "skip pointers are only supported with the Boolean model",
                ))
            }
            Optimization::Thresholding | Optimization::EarlyStopping
                if self.model == RankingModel::Boolean =>
            {
                Err(QuillError::config(
                    "thresholding and early stopping require a ranked model",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Canonical identifier, used as the on-disk key.
    pub fn identifier(&self) -> String {
        format!(
            "{}_i{}d{}c{}o{}",
            self.engine,
            self.model.code(),
            self.datastore.code(),
            self.compression.code(),
            self.optimization.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_format() {
        let spec = IndexSpec::new(
            RankingModel::TfIdf,
            Datastore::Relational,
            Compression::Elias,
            Optimization::Thresholding,
        )
        .unwrap();
        assert_eq!(spec.identifier(), "quill_i3d2c2oth");

        let spec = IndexSpec::new(
            RankingModel::Boolean,
            Datastore::DocumentStore,
            Compression::None,
            Optimization::None,
        )
        .unwrap();
        assert_eq!(spec.identifier(), "quill_i1d1c1o0");
    }

    #[test]
    fn test_engine_name_override() {
        let spec = IndexSpec::new(
            RankingModel::Tf,
            Datastore::DocumentStore,
            Compression::Zlib,
            Optimization::EarlyStopping,
        )
        .unwrap()
        .engine("bench");
        assert_eq!(spec.identifier(), "bench_i2d1c3oes");
    }

    #[test]
    fn test_skip_pointers_require_boolean() {
        assert!(IndexSpec::new(
            RankingModel::Tf,
            Datastore::DocumentStore,
            Compression::None,
            Optimization::SkipPointers,
        )
        .is_err());
        assert!(IndexSpec::new(
            RankingModel::Boolean,
            Datastore::DocumentStore,
            Compression::None,
            Optimization::SkipPointers,
        )
        .is_ok());
    }

    #[test]
    fn test_score_heuristics_require_ranked_model() {
        assert!(IndexSpec::new(
            RankingModel::Boolean,
            Datastore::Relational,
            Compression::None,
            Optimization::Thresholding,
        )
        .is_err());
        assert!(IndexSpec::new(
            RankingModel::TfIdf,
            Datastore::Relational,
            Compression::None,
            Optimization::EarlyStopping,
        )
        .is_ok());
    }

    #[test]
    fn test_code_round_trips() {
        for opt in [
            Optimization::None,
            Optimization::SkipPointers,
            Optimization::Thresholding,
            Optimization::EarlyStopping,
        ] {
            assert_eq!(Optimization::from_code(opt.code()).unwrap(), opt);
        }
        for ds in [Datastore::DocumentStore, Datastore::Relational] {
            assert_eq!(Datastore::from_code(ds.code()).unwrap(), ds);
        }
        for c in [Compression::None, Compression::Elias, Compression::Zlib] {
            assert_eq!(Compression::from_code(c.code()).unwrap(), c);
        }
    }
}

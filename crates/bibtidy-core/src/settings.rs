//! Settings for bibtidy
//!
//! Two TOML documents drive the tool: the formatting settings (field schema,
//! accent table, policies, fetch options) and the abbreviation table. Both
//! have built-in defaults, and any key present in a user file overrides the
//! default for that key.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use bibtidy_bibtex::{Abbreviations, FieldNormalizer};

use crate::http::HttpError;

/// Directory name under the platform config directory
const CONFIG_DIR: &str = "bibtidy";
const SETTINGS_FILE: &str = "settings.toml";
const ABBREVIATIONS_FILE: &str = "abbreviations.toml";

/// Settings loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid accent table: {0}")]
    InvalidPattern(String),
    #[error("Cannot create HTTP client: {0}")]
    HttpClient(#[from] HttpError),
}

/// Formatting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Indentation placed before every field line
    pub indentation: String,
    /// Rewrite `url` as a DOI resolver link whenever a DOI is known
    pub replace_url: bool,
    /// Replace `journal` with its ISO 4 abbreviation
    pub abbreviate_journal: bool,
    /// Fields whose value gets an extra pair of braces
    pub case_sensitive: Vec<String>,
    /// Literal character to LaTeX replacement
    pub accents: BTreeMap<String, String>,
    /// Entry kind to its ordered list of fields
    pub fields: BTreeMap<String, Vec<String>>,
    pub fetch: FetchSettings,
}

/// DOI lookup options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// DOI resolver base URL
    pub resolver: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Honour proxy environment variables
    pub use_proxy: bool,
}

/// Abbreviation table with the article and short-word lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbbreviationConfig {
    pub articles: Vec<String>,
    pub shortwords: Vec<String>,
    /// LTWA pattern (with `-` stem markers) to abbreviation
    pub ltwa: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indentation: "  ".to_string(),
            replace_url: true,
            abbreviate_journal: true,
            case_sensitive: vec!["title".to_string()],
            accents: DEFAULT_ACCENTS
                .iter()
                .map(|(c, code)| (c.to_string(), code.to_string()))
                .collect(),
            fields: DEFAULT_FIELDS
                .iter()
                .map(|(kind, fields)| {
                    (
                        kind.to_string(),
                        fields.iter().map(|f| f.to_string()).collect(),
                    )
                })
                .collect(),
            fetch: FetchSettings::default(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            resolver: bibtidy_identifiers::DEFAULT_RESOLVER.to_string(),
            timeout_secs: 30,
            user_agent: format!("bibtidy/{}", env!("CARGO_PKG_VERSION")),
            use_proxy: true,
        }
    }
}

impl Default for AbbreviationConfig {
    fn default() -> Self {
        let words = |ws: &[&str]| -> Vec<String> { ws.iter().map(|w| w.to_string()).collect() };
        Self {
            articles: words(DEFAULT_ARTICLES),
            shortwords: words(DEFAULT_SHORTWORDS),
            ltwa: DEFAULT_LTWA
                .iter()
                .map(|(p, r)| (p.to_string(), r.to_string()))
                .collect(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize settings to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_toml(path)
    }

    /// Use `explicit` if given, else the user config file if it exists, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        discover(explicit, SETTINGS_FILE)
    }

    /// Build the field normalizer for these settings
    pub fn normalizer(&self) -> Result<FieldNormalizer, ConfigError> {
        if let Some((key, _)) = self.accents.iter().find(|(key, _)| key.is_empty()) {
            return Err(ConfigError::InvalidPattern(format!(
                "empty accent key {:?}",
                key
            )));
        }

        let schema = self
            .fields
            .iter()
            .map(|(kind, fields)| {
                (
                    kind.to_lowercase(),
                    fields.iter().map(|f| f.to_lowercase()).collect(),
                )
            })
            .collect();
        let accents: HashMap<String, String> = self.accents.clone().into_iter().collect();
        let case_sensitive: HashSet<String> =
            self.case_sensitive.iter().map(|f| f.to_lowercase()).collect();

        FieldNormalizer::new(schema, accents, case_sensitive)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))
    }
}

impl AbbreviationConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_toml(path)
    }

    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        discover(explicit, ABBREVIATIONS_FILE)
    }

    /// Build the immutable abbreviation table
    pub fn build(&self) -> Abbreviations {
        Abbreviations::new(
            self.ltwa.iter().map(|(p, r)| (p.as_str(), r.as_str())),
            &self.articles,
            &self.shortwords,
        )
    }
}

/// Path of a file in the user config directory
pub fn user_config_path(file: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(file))
}

fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn discover<T>(explicit: Option<&Path>, file: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if let Some(path) = explicit {
        tracing::debug!("Loading {} from {}", file, path.display());
        return load_toml(path);
    }

    match user_config_path(file) {
        Some(path) if path.is_file() => {
            tracing::debug!("Loading {} from {}", file, path.display());
            load_toml(&path)
        }
        _ => Ok(T::default()),
    }
}

// ===== Defaults =====

const DEFAULT_FIELDS: &[(&str, &[&str])] = &[
    (
        "article",
        &[
            "author", "title", "journal", "year", "volume", "number", "pages", "month", "doi",
            "url", "note",
        ],
    ),
    (
        "book",
        &[
            "author", "editor", "title", "publisher", "year", "volume", "number", "series",
            "address", "edition", "month", "isbn", "doi", "url", "note",
        ],
    ),
    (
        "booklet",
        &[
            "author", "title", "howpublished", "address", "month", "year", "doi", "url", "note",
        ],
    ),
    (
        "inbook",
        &[
            "author", "editor", "title", "chapter", "pages", "publisher", "year", "volume",
            "number", "series", "address", "edition", "month", "isbn", "doi", "url", "note",
        ],
    ),
    (
        "incollection",
        &[
            "author", "title", "booktitle", "publisher", "year", "editor", "volume", "number",
            "series", "pages", "address", "month", "isbn", "doi", "url", "note",
        ],
    ),
    (
        "inproceedings",
        &[
            "author", "title", "booktitle", "year", "editor", "volume", "number", "series",
            "pages", "address", "month", "organization", "publisher", "doi", "url", "note",
        ],
    ),
    (
        "manual",
        &[
            "author", "title", "organization", "address", "edition", "month", "year", "url",
            "note",
        ],
    ),
    (
        "mastersthesis",
        &[
            "author", "title", "school", "year", "type", "address", "month", "url", "note",
        ],
    ),
    (
        "misc",
        &[
            "author", "title", "howpublished", "month", "year", "doi", "url", "note",
        ],
    ),
    (
        "phdthesis",
        &[
            "author", "title", "school", "year", "type", "address", "month", "url", "note",
        ],
    ),
    (
        "proceedings",
        &[
            "editor", "title", "year", "volume", "number", "series", "address", "month",
            "organization", "publisher", "doi", "url", "note",
        ],
    ),
    (
        "techreport",
        &[
            "author", "title", "institution", "year", "type", "number", "address", "month",
            "doi", "url", "note",
        ],
    ),
    (
        "unpublished",
        &["author", "title", "month", "year", "url", "note"],
    ),
];

const DEFAULT_ACCENTS: &[(&str, &str)] = &[
    // Umlaut (diaeresis)
    ("ä", r#"{\"a}"#), ("Ä", r#"{\"A}"#),
    ("ë", r#"{\"e}"#), ("Ë", r#"{\"E}"#),
    ("ï", r#"{\"i}"#), ("Ï", r#"{\"I}"#),
    ("ö", r#"{\"o}"#), ("Ö", r#"{\"O}"#),
    ("ü", r#"{\"u}"#), ("Ü", r#"{\"U}"#),
    ("ÿ", r#"{\"y}"#),
    // Acute accent
    ("á", r"{\'a}"), ("Á", r"{\'A}"),
    ("é", r"{\'e}"), ("É", r"{\'E}"),
    ("í", r"{\'i}"), ("Í", r"{\'I}"),
    ("ó", r"{\'o}"), ("Ó", r"{\'O}"),
    ("ú", r"{\'u}"), ("Ú", r"{\'U}"),
    ("ý", r"{\'y}"), ("ć", r"{\'c}"),
    ("ń", r"{\'n}"), ("ś", r"{\'s}"),
    ("ź", r"{\'z}"),
    // Grave accent
    ("à", r"{\`a}"), ("À", r"{\`A}"),
    ("è", r"{\`e}"), ("È", r"{\`E}"),
    ("ì", r"{\`i}"), ("ò", r"{\`o}"),
    ("ù", r"{\`u}"),
    // Circumflex
    ("â", r"{\^a}"), ("ê", r"{\^e}"),
    ("î", r"{\^i}"), ("ô", r"{\^o}"),
    ("û", r"{\^u}"),
    // Tilde
    ("ã", r"{\~a}"), ("ñ", r"{\~n}"),
    ("Ñ", r"{\~N}"), ("õ", r"{\~o}"),
    // Caron
    ("č", r"{\v{c}}"), ("Č", r"{\v{C}}"),
    ("ř", r"{\v{r}}"), ("Ř", r"{\v{R}}"),
    ("š", r"{\v{s}}"), ("Š", r"{\v{S}}"),
    ("ž", r"{\v{z}}"), ("Ž", r"{\v{Z}}"),
    ("ě", r"{\v{e}}"),
    // Cedilla and friends
    ("ç", r"{\c{c}}"), ("Ç", r"{\c{C}}"),
    ("å", r"{\aa}"), ("Å", r"{\AA}"),
    ("ø", r"{\o}"), ("Ø", r"{\O}"),
    ("æ", r"{\ae}"), ("Æ", r"{\AE}"),
    ("œ", r"{\oe}"), ("ß", r"{\ss}"),
    ("ł", r"{\l}"), ("Ł", r"{\L}"),
    // Dashes
    ("–", "--"), ("—", "---"),
];

const DEFAULT_ARTICLES: &[&str] = &[
    "a", "an", "the", "der", "die", "das", "le", "la", "les", "l'", "el", "il", "lo", "los",
    "las", "un", "une", "ein", "eine",
];

const DEFAULT_SHORTWORDS: &[&str] = &[
    "and", "or", "of", "for", "in", "on", "at", "to", "by", "with", "from", "into", "&", "und",
    "fur", "uber", "zur", "zum", "de", "du", "des", "et", "en", "y", "e", "di", "del", "della",
    "van", "von",
];

const DEFAULT_LTWA: &[(&str, &str)] = &[
    ("academ-", "acad."),
    ("advance-", "adv."),
    ("america-", "am."),
    ("analy-", "anal."),
    ("annal-", "ann."),
    ("appli-", "appl."),
    ("astronom-", "astron."),
    ("astrophys-", "astrophys."),
    ("biochem-", "biochem."),
    ("biolog-", "biol."),
    ("bulletin", "bull."),
    ("chem-", "chem."),
    ("communication", "commun."),
    ("comput-", "comput."),
    ("condens-", "condens."),
    ("conference", "conf."),
    ("engineer-", "eng."),
    ("europe-", "eur."),
    ("experiment-", "exp."),
    ("geophys-", "geophys."),
    ("institut-", "inst."),
    ("international", "int."),
    ("journal", "j."),
    ("letter", "lett."),
    ("material-", "mater."),
    ("mathemat-", "math."),
    ("mechani-", "mech."),
    ("medic-", "med."),
    ("molecul-", "mol."),
    ("monthly", "mon."),
    ("nation-", "natl."),
    ("notice", "not."),
    ("nuclear", "nucl."),
    ("optic-", "opt."),
    ("physic-", "phys."),
    ("proceeding-", "proc."),
    ("report-", "rep."),
    ("research", "res."),
    ("review", "rev."),
    ("royal", "r."),
    ("scien-", "sci."),
    ("societ-", "soc."),
    ("statist-", "stat."),
    ("supplement-", "suppl."),
    ("technolog-", "technol."),
    ("theor-", "theor."),
    ("transaction-", "trans."),
    ("universit-", "univ."),
];

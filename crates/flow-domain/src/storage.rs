// storage.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

const SCHEME: &str = "gs://";

/// Ubicación en el object store: bucket + nombre (o prefijo) de objeto.
///
/// `object` puede estar vacío (raíz del bucket), terminar en `/` (un
/// "directorio") o contener comodines (`*`, `?`) cuando se usa como patrón.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcsUri {
    bucket: String,
    object: String,
}

impl GcsUri {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Result<Self, DomainError> {
        let bucket = bucket.into();
        let object = object.into();
        if bucket.is_empty() || bucket.contains('/') || bucket.contains('*') {
            return Err(DomainError::InvalidUri(format!("bucket inválido: '{bucket}'")));
        }
        Ok(Self { bucket,
                  object: object.trim_start_matches('/').to_string() })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Agrega un segmento, insertando `/` si hace falta.
    pub fn join(&self, name: &str) -> GcsUri {
        let name = name.trim_start_matches('/');
        let object = if self.object.is_empty() || self.object.ends_with('/') {
            format!("{}{}", self.object, name)
        } else {
            format!("{}/{}", self.object, name)
        };
        GcsUri { bucket: self.bucket.clone(),
                 object }
    }

    /// Parte "directorio" del objeto (hasta el último `/`, incluido).
    pub fn parent_dir(&self) -> GcsUri {
        let object = match self.object.rfind('/') {
            Some(i) => self.object[..=i].to_string(),
            None => String::new(),
        };
        GcsUri { bucket: self.bucket.clone(),
                 object }
    }

    pub fn is_pattern(&self) -> bool {
        self.object.contains(['*', '?'])
    }

    /// `true` si el nombre de objeto dado cumple este patrón (mismo bucket).
    pub fn matches(&self, bucket: &str, object: &str) -> bool {
        bucket == self.bucket && glob_match(&self.object, object)
    }
}

impl fmt::Display for GcsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.bucket, self.object)
    }
}

impl FromStr for GcsUri {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(SCHEME)
                    .ok_or_else(|| DomainError::InvalidUri(format!("se esperaba esquema gs:// en '{s}'")))?;
        let (bucket, object) = rest.split_once('/').unwrap_or((rest, ""));
        GcsUri::new(bucket, object)
    }
}

/// Comodines estilo gsutil sobre nombres de objeto: `*` cualquier secuencia
/// sin `/`, `?` un carácter distinto de `/`.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0usize, 0usize);
    // Último `*` visto y posición de `name` asociada, para retroceder.
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == n[ni] || (p[pi] == '?' && n[ni] != '/')) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            if n[sn] == '/' {
                return false;
            }
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let uri: GcsUri = "gs://logistic-bucket/input-delta-data/".parse().unwrap();
        assert_eq!(uri.bucket(), "logistic-bucket");
        assert_eq!(uri.object(), "input-delta-data/");
        assert_eq!(uri.to_string(), "gs://logistic-bucket/input-delta-data/");
        assert_eq!(uri.join("logistics_*.csv").to_string(),
                   "gs://logistic-bucket/input-delta-data/logistics_*.csv");
    }

    #[test]
    fn bucket_only_uri() {
        let uri: GcsUri = "gs://b".parse().unwrap();
        assert_eq!(uri.object(), "");
        assert_eq!(uri.join("x").object(), "x");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!("s3://b/x".parse::<GcsUri>(), Err(DomainError::InvalidUri(_))));
        assert!("gs:///x".parse::<GcsUri>().is_err());
    }

    #[test]
    fn glob_star_does_not_cross_directories() {
        assert!(glob_match("input-delta-data/logistics_*.csv", "input-delta-data/logistics_20230901.csv"));
        assert!(!glob_match("input-delta-data/logistics_*.csv", "input-delta-data/logistics_1.json"));
        assert!(!glob_match("input-delta-data/logistics_*.csv", "input-delta-data/logistics_a/b.csv"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "a/c"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("logistics_**", "logistics_"));
    }

    #[test]
    fn parent_dir_of_pattern() {
        let uri: GcsUri = "gs://b/in/logistics_*.csv".parse().unwrap();
        assert!(uri.is_pattern());
        assert_eq!(uri.parent_dir().to_string(), "gs://b/in/");
    }
}

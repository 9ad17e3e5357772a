use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("Invalid Maven coordinate '{0}': expected group:artifact:version")]
    TooFewSegments(String),
    #[error("Invalid Maven coordinate '{0}': empty segment")]
    EmptySegment(String),
}

/// `group:artifact:version[:classifier][@extension]`, as used by library
/// entries in version descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl MavenCoordinate {
    pub fn parse(coords: &str) -> Result<Self, CoordinateError> {
        let (body, extension) = match coords.rsplit_once('@') {
            Some((body, ext)) if !ext.is_empty() && !ext.contains(':') => (body, ext),
            _ => (coords, "jar"),
        };

        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() < 3 {
            return Err(CoordinateError::TooFewSegments(coords.to_string()));
        }
        if parts[..3].iter().any(|p| p.is_empty()) {
            return Err(CoordinateError::EmptySegment(coords.to_string()));
        }

        // Anything past the classifier is folded into it rather than dropped.
        let classifier = match &parts[3..] {
            [] => None,
            rest => Some(rest.join("-")).filter(|c| !c.is_empty()),
        };

        Ok(Self {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier,
            extension: extension.to_string(),
        })
    }

    /// Path below the libraries directory, always with `/` separators.
    pub fn relative_path(&self) -> String {
        let file = match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact_id, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        };
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            file
        )
    }
}

impl FromStr for MavenCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

/// `(group, artifact, version, classifier?) -> relative jar path`.
pub fn library_relative_path(
    group_id: &str,
    artifact_id: &str,
    version: &str,
    classifier: Option<&str>,
) -> String {
    MavenCoordinate {
        group_id: group_id.to_string(),
        artifact_id: artifact_id.to_string(),
        version: version.to_string(),
        classifier: classifier.map(str::to_string),
        extension: "jar".to_string(),
    }
    .relative_path()
}

//! Storage path and public URL templates.
//!
//! Templates use `[:name]` placeholders and are parsed once, when the
//! configuration is loaded. An unknown placeholder is a configuration error,
//! so rendering itself cannot fail.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::TemplateError;
use crate::models::{ResolvedArtifact, UploadIdentity};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\[:([a-zA-Z0-9_]+)\]").unwrap();
}

/// Variables a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Owner,
    Repo,
    PullNumber,
    FileName,
    FileBaseName,
    FileExtension,
    ShortCommitHash,
    ContentHash,
}

impl FromStr for Placeholder {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "owner" => Ok(Placeholder::Owner),
            "repo" => Ok(Placeholder::Repo),
            "pull_number" => Ok(Placeholder::PullNumber),
            "file_name" => Ok(Placeholder::FileName),
            "file_base_name" | "file_basename" => Ok(Placeholder::FileBaseName),
            "file_extension" | "file_extname" => Ok(Placeholder::FileExtension),
            "short_commit_hash" | "commit_short_hash" => Ok(Placeholder::ShortCommitHash),
            "content_hash" | "file_hash" => Ok(Placeholder::ContentHash),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(Placeholder),
}

/// Values substituted into a template for one artifact of one upload.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub identity: &'a UploadIdentity,
    pub artifact: &'a ResolvedArtifact,
}

impl<'a> TemplateVars<'a> {
    pub fn new(identity: &'a UploadIdentity, artifact: &'a ResolvedArtifact) -> Self {
        Self { identity, artifact }
    }

    fn value(&self, placeholder: Placeholder) -> String {
        match placeholder {
            Placeholder::Owner => self.identity.repository.owner.clone(),
            Placeholder::Repo => self.identity.repository.repo.clone(),
            Placeholder::PullNumber => self.identity.pull_number.to_string(),
            Placeholder::FileName => self.artifact.file_name.clone(),
            Placeholder::FileBaseName => self.artifact.file_base_name.clone(),
            Placeholder::FileExtension => self.artifact.file_extension.clone(),
            Placeholder::ShortCommitHash => self.identity.short_commit_hash().to_string(),
            Placeholder::ContentHash => self.artifact.blob.content_hash.clone(),
        }
    }
}

/// A parsed path or URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut segments, source, &source[last..whole.start()])?;
            let placeholder = name.as_str().parse::<Placeholder>().map_err(|_| {
                TemplateError::UnknownPlaceholder {
                    name: name.as_str().to_string(),
                    template: source.to_string(),
                }
            })?;
            segments.push(Segment::Variable(placeholder));
            last = whole.end();
        }

        push_literal(&mut segments, source, &source[last..])?;

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn render(&self, vars: &TemplateVars<'_>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Variable(placeholder) => vars.value(*placeholder),
            })
            .collect()
    }
}

fn push_literal(segments: &mut Vec<Segment>, source: &str, text: &str) -> Result<(), TemplateError> {
    if text.contains("[:") {
        return Err(TemplateError::Unterminated(source.to_string()));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{identity, resolved};

    #[test]
    fn test_render_all_placeholders() {
        let identity = identity("build-linux");
        let artifact = resolved(b"abc", "game.tar.gz");
        let template = PathTemplate::parse(
            "/srv/[:owner]/[:repo]/[:pull_number]/[:short_commit_hash]/[:file_base_name]-[:content_hash][:file_extension]",
        )
        .unwrap();

        let rendered = template.render(&TemplateVars::new(&identity, &artifact));
        assert_eq!(
            rendered,
            format!(
                "/srv/octo/widgets/42/{}/game.tar-{}.gz",
                &identity.commit_hash[..8],
                artifact.blob.content_hash
            )
        );
    }

    #[test]
    fn test_legacy_aliases() {
        let identity = identity("build");
        let artifact = resolved(b"abc", "a.txt");
        let template =
            PathTemplate::parse("[:commit_short_hash]/[:file_basename][:file_extname]/[:file_hash]").unwrap();
        let rendered = template.render(&TemplateVars::new(&identity, &artifact));
        assert!(rendered.ends_with(&format!("/a.txt/{}", artifact.blob.content_hash)));
    }

    #[test]
    fn test_unknown_placeholder_fails_loudly() {
        let err = PathTemplate::parse("/srv/[:branch]/[:file_name]").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder {
                name: "branch".to_string(),
                template: "/srv/[:branch]/[:file_name]".to_string(),
            }
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert!(matches!(
            PathTemplate::parse("/srv/[:file_name"),
            Err(TemplateError::Unterminated(_))
        ));
        assert!(matches!(
            PathTemplate::parse("/srv/[:pull-number]/[:file_name]"),
            Err(TemplateError::Unterminated(_))
        ));
    }

    #[test]
    fn test_literal_only_template() {
        let template = PathTemplate::parse("https://example.com/latest").unwrap();
        let identity = identity("build");
        let artifact = resolved(b"abc", "a.txt");
        assert_eq!(
            template.render(&TemplateVars::new(&identity, &artifact)),
            "https://example.com/latest"
        );
    }
}

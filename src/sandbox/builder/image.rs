//! Agent image selection.

/// Image used when nothing else picks one.
pub const DEFAULT_IMAGE: &str = "ghcr.io/endorhq/rover/agent:latest";

/// Environment variable that overrides every other image setting.
pub const IMAGE_ENV_VAR: &str = "ROVER_AGENT_IMAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Environment,
    Task,
    Project,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChoice {
    pub image: String,
    pub source: ImageSource,
}

impl ImageChoice {
    pub fn is_default(&self) -> bool {
        self.image == DEFAULT_IMAGE
    }
}

/// Pick the image: environment override, then the task's pinned image, then
/// the project image, then `DEFAULT_IMAGE`. Blank values are skipped.
pub fn resolve_image(
    env_override: Option<&str>,
    task_image: Option<&str>,
    project_image: Option<&str>,
) -> ImageChoice {
    let candidates = [
        (env_override, ImageSource::Environment),
        (task_image, ImageSource::Task),
        (project_image, ImageSource::Project),
    ];
    candidates
        .into_iter()
        .find_map(|(image, source)| {
            let image = image?.trim();
            (!image.is_empty()).then(|| ImageChoice {
                image: image.to_string(),
                source,
            })
        })
        .unwrap_or_else(|| ImageChoice {
            image: DEFAULT_IMAGE.to_string(),
            source: ImageSource::Default,
        })
}

/// `ROVER_AGENT_IMAGE`, if set.
pub fn image_override_from_env() -> Option<String> {
    std::env::var(IMAGE_ENV_VAR).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let choice = resolve_image(Some("env:1"), Some("task:1"), Some("project:1"));
        assert_eq!(choice.image, "env:1");
        assert_eq!(choice.source, ImageSource::Environment);

        let choice = resolve_image(None, Some("task:1"), Some("project:1"));
        assert_eq!(choice.source, ImageSource::Task);

        let choice = resolve_image(Some("  "), None, Some("project:1"));
        assert_eq!(choice.image, "project:1");
        assert_eq!(choice.source, ImageSource::Project);
    }

    #[test]
    fn test_default_image() {
        let choice = resolve_image(None, None, None);
        assert_eq!(choice.image, DEFAULT_IMAGE);
        assert_eq!(choice.source, ImageSource::Default);
        assert!(choice.is_default());
        assert!(!resolve_image(None, None, Some("my/img")).is_default());
    }
}

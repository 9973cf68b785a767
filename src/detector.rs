use crate::defaults::{BOT_USER_AGENTS, STATIC_FILE_EXTENSIONS};
use regex::{escape, Regex, RegexBuilder};

/// Compiled request-eligibility patterns.
///
/// Both patterns are compiled exactly once, when the handler is configured,
/// and reused for every request.
#[derive(Debug)]
pub(crate) struct BotDetector {
    user_agent_pattern: Regex,
    exclude_url_pattern: Regex,
}

fn compile(pattern: &str, description: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|error| panic!("could not compile {description} pattern: {error}"))
}

fn alternation<I>(base: &[&str], extras: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    base.iter()
        .map(|entry| (*entry).to_string())
        .chain(extras.into_iter().map(|extra| escape(extra.as_ref())))
        .collect::<Vec<_>>()
        .join("|")
}

impl BotDetector {
    pub(crate) fn new() -> Self {
        Self {
            user_agent_pattern: Self::bot_user_agents(None::<&str>),
            exclude_url_pattern: Self::excluded_extensions(None::<&str>),
        }
    }

    /// builds the default user agent pattern, an alternation of the
    /// signatures in [`BOT_USER_AGENTS`] plus the provided extras. extras are
    /// escaped, so they always match literally.
    pub(crate) fn bot_user_agents<I>(extras: I) -> Regex
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        compile(&alternation(BOT_USER_AGENTS, extras), "user agent")
    }

    /// builds the default path exclusion pattern, matching any path that ends
    /// in one of the extensions from [`STATIC_FILE_EXTENSIONS`] plus the
    /// provided extras.
    pub(crate) fn excluded_extensions<I>(extras: I) -> Regex
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        compile(
            &format!(r"\.({})$", alternation(STATIC_FILE_EXTENSIONS, extras)),
            "url exclusion",
        )
    }

    /// replaces the user agent pattern with a caller-supplied regex,
    /// compiled verbatim. panics on a malformed pattern.
    pub(crate) fn set_user_agent_pattern(&mut self, pattern: &str) {
        self.user_agent_pattern = compile(pattern, "user agent");
    }

    /// replaces the path exclusion pattern with a caller-supplied regex,
    /// compiled verbatim. panics on a malformed pattern.
    pub(crate) fn set_exclude_url_pattern(&mut self, pattern: &str) {
        self.exclude_url_pattern = compile(pattern, "url exclusion");
    }

    pub(crate) fn set_user_agents(&mut self, pattern: Regex) {
        self.user_agent_pattern = pattern;
    }

    pub(crate) fn set_excluded_urls(&mut self, pattern: Regex) {
        self.exclude_url_pattern = pattern;
    }

    /// determines whether a request should be served a prerendered snapshot.
    ///
    /// eligible only when a nonempty user agent matches the crawler pattern
    /// and the path does not match the exclusion pattern. an absent or empty
    /// user agent is never eligible, regardless of the configured patterns.
    pub(crate) fn should_prerender(&self, user_agent: Option<&str>, path: &str) -> bool {
        match user_agent {
            None | Some("") => false,
            Some(user_agent) => {
                self.user_agent_pattern.is_match(user_agent)
                    && !self.exclude_url_pattern.is_match(path)
            }
        }
    }
}

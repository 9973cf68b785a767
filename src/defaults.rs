/// User agent signatures for crawlers and link-preview bots that do not
/// execute javascript, and therefore benefit from receiving a prerendered
/// snapshot instead of the application shell.
///
/// These are matched case-insensitively as substrings of the inbound
/// `User-Agent` header. Extend the list with
/// [`Prerender::with_extra_bot_user_agents`](crate::Prerender::with_extra_bot_user_agents)
/// or replace it entirely with
/// [`Prerender::with_user_agent_pattern`](crate::Prerender::with_user_agent_pattern).
pub const BOT_USER_AGENTS: &[&str] = &[
    "Baiduspider",
    "bingbot",
    "Embedly",
    "facebookexternalhit",
    "LinkedInBot",
    "outbrain",
    "pinterest",
    "quora link preview",
    "rogerbot",
    "showyoubot",
    "Slackbot",
    "TelegramBot",
    "Twitterbot",
    "vkShare",
    "W3C_Validator",
    "WhatsApp",
];

/// File extensions for static assets that are never worth rendering, even
/// when requested by a crawler.
///
/// A request whose path ends in `.{extension}` (case-insensitively) is always
/// passed through untouched. Extend the list with
/// [`Prerender::with_extra_excluded_extensions`](crate::Prerender::with_extra_excluded_extensions)
/// or replace the compiled pattern with
/// [`Prerender::with_exclude_url_pattern`](crate::Prerender::with_exclude_url_pattern).
pub const STATIC_FILE_EXTENSIONS: &[&str] = &[
    "ai", "avi", "css", "dat", "dmg", "doc", "exe", "flv", "gif", "ico", "iso", "jpeg", "jpg",
    "js", "less", "m4a", "m4v", "mov", "mp3", "mp4", "mpeg", "mpg", "pdf", "png", "ppt", "psd",
    "rar", "rss", "svg", "swf", "tif", "torrent", "ttf", "txt", "wav", "wmv", "woff", "xls",
    "xml", "zip",
];

//! Local file names for downloaded media.

/// Characters removed from derived file names.
const INVALID_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '\'', '<', '>', '|'];

const MEDIA_EXTENSION: &str = ".mp3";

/// Strip characters that are not allowed in file names.
pub fn valid_file_name(input: &str) -> String {
    input.chars().filter(|c| !INVALID_CHARS.contains(c)).collect()
}

/// `{artist}-{title}.mp3` with illegal characters stripped.
pub fn media_file_name(artist: &str, title: &str) -> String {
    valid_file_name(&format!("{artist}-{title}{MEDIA_EXTENSION}"))
}

/// Last path segment of a URL, used when no name is supplied.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let name = valid_file_name(last);
    (!name.is_empty()).then_some(name)
}

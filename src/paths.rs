//! Module to specify object paths in user friendly manners.

use std::fmt::{Debug, Display};

use crate::error::TdmsError;

/// The internal type of paths into the TDMS file.
pub type ObjectPath<'a> = &'a str;

/// Names in the path must be escaped.
///
/// Single quotes are replaced by double quotes
/// as specified in the TDMS Internal Structure document.
fn escape_name(name: &str) -> String {
    name.replace('\'', "\"")
}

fn unescape_name(name: &str) -> String {
    name.replace('"', "'")
}

/// A path to a location in a tdms file.
///
/// These will format the path correctly and turn it into a owned string
/// (i.e. it does allocation)
///
/// ```rust
/// use tdms_stream::PropertyPath;
///
/// let path = PropertyPath::channel("group", "channel");
/// assert_eq!(path.path(), "/'group'/'channel'");
/// ```
///
/// The [`PropertyPath::file`] path is a special case and is used to specify the root of the file.
///
/// ```rust
/// use tdms_stream::PropertyPath;
///
/// let path = PropertyPath::file();
/// assert_eq!(path.path(), "/");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Path to the root of the file.
    pub fn file() -> Self {
        Self(String::from("/"))
    }

    /// Generate a path to a group.
    pub fn group(group: &str) -> Self {
        Self(format!("/'{}'", escape_name(group)))
    }

    /// Generate a path to a channel.
    pub fn channel(group: &str, channel: &str) -> Self {
        Self(format!(
            "/'{}'/'{}'",
            escape_name(group),
            escape_name(channel)
        ))
    }

    /// Get the path in the internal format.
    pub fn path(&self) -> ObjectPath {
        self.0.as_ref()
    }
}

impl Debug for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path for a channel in the TDMS file.
///
/// This is a wrapper around the [`PropertyPath`] to indicate that it is a channel.
///
/// ```rust
/// use tdms_stream::ChannelPath;
///
/// let path = ChannelPath::new("group", "channel");
/// assert_eq!(path.path(), "/'group'/'channel'");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPath(PropertyPath);

impl ChannelPath {
    /// Get the path in the internal format.
    pub fn path(&self) -> ObjectPath {
        self.0.path()
    }

    /// Create a new channel path for the specified group and channel.
    ///
    /// NOTE: This allocates internally.
    pub fn new(group: &str, channel: &str) -> Self {
        Self(PropertyPath::channel(group, channel))
    }
}

// Needed to take slice of ChannelPath or &ChannelPath.
impl AsRef<ChannelPath> for ChannelPath {
    fn as_ref(&self) -> &ChannelPath {
        self
    }
}

// Needed to support input into the property path functions.
impl AsRef<PropertyPath> for ChannelPath {
    fn as_ref(&self) -> &PropertyPath {
        &self.0
    }
}

impl Display for ChannelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", PropertyPath::path(&self.0))
    }
}

/// Split an internal path into its unescaped name components.
///
/// The root path `/` returns no components, a group path one and a channel
/// path two. Anything else is rejected as [`TdmsError::InvalidPath`].
pub(crate) fn path_components(path: ObjectPath) -> Result<Vec<String>, TdmsError> {
    if path == "/" {
        return Ok(vec![]);
    }

    let invalid = || TdmsError::InvalidPath(path.to_string());

    let mut components = Vec::new();
    let mut remaining = path;
    while !remaining.is_empty() {
        remaining = remaining.strip_prefix("/'").ok_or_else(invalid)?;
        let end = remaining.find('\'').ok_or_else(invalid)?;
        components.push(unescape_name(&remaining[..end]));
        remaining = &remaining[end + 1..];
    }

    if components.len() > 2 {
        return Err(invalid());
    }
    Ok(components)
}

/// Extract just the group name from an internal path.
pub(crate) fn group_of_path(path: ObjectPath) -> Result<Option<String>, TdmsError> {
    Ok(path_components(path)?.into_iter().next())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_root_path() {
        let path = PropertyPath::file();
        assert_eq!(path.path(), "/");
    }

    #[test]
    fn test_group_path() {
        let path = PropertyPath::group("group");
        assert_eq!(path.path(), "/'group'");
    }

    #[test]
    fn test_channel_path() {
        let path = PropertyPath::channel("group", "channel");
        assert_eq!(path.path(), "/'group'/'channel'");
    }

    #[test]
    fn test_channel_path_type() {
        let path = ChannelPath::new("group", "channel");
        assert_eq!(path.path(), "/'group'/'channel'");
    }

    #[test]
    fn test_group_escapes_chars() {
        let path = PropertyPath::group("group'with'quotes");
        assert_eq!(path.path(), r#"/'group"with"quotes'"#);
    }

    #[test]
    fn test_channel_escapes_chars() {
        let path = PropertyPath::channel("group'with'quotes", "channel'with'quotes");
        assert_eq!(path.path(), r#"/'group"with"quotes'/'channel"with"quotes'"#);
    }

    #[test]
    fn test_components_of_root() {
        assert_eq!(path_components("/").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_components_of_channel() {
        let components = path_components("/'group'/'channel'").unwrap();
        assert_eq!(components, vec!["group".to_string(), "channel".to_string()]);
    }

    #[test]
    fn test_components_unescape() {
        let components = path_components(r#"/'group"with"quotes'"#).unwrap();
        assert_eq!(components, vec!["group'with'quotes".to_string()]);
    }

    #[test]
    fn test_components_rejects_unquoted() {
        assert!(path_components("group/channel").is_err());
        assert!(path_components("/'group").is_err());
    }
}

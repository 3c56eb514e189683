/// Anything that can be turned into the segments of a URI path,
/// one `Uri-Path` option per segment.
///
/// A single string is split on `/`, skipping empty segments,
/// so `"/a/b/c"`, `"a/b/c"` and `"a//b/c/"` all mean `["a", "b", "c"]`.
///
/// A list of segments is taken as-is.
///
/// ```
/// use toad_script::pdu::IntoUriPath;
///
/// assert_eq!("/a//b/c/".into_segments(), vec!["a", "b", "c"]);
/// assert_eq!(["a", "b", "c"].into_segments(), "a/b/c".into_segments());
/// ```
pub trait IntoUriPath {
  /// Split into path segments
  fn into_segments(self) -> Vec<String>;
}

impl<'a> IntoUriPath for &'a str {
  fn into_segments(self) -> Vec<String> {
    self.split('/')
        .filter(|seg| !seg.is_empty())
        .map(String::from)
        .collect()
  }
}

impl<'a> IntoUriPath for &'a String {
  fn into_segments(self) -> Vec<String> {
    self.as_str().into_segments()
  }
}

impl IntoUriPath for String {
  fn into_segments(self) -> Vec<String> {
    self.as_str().into_segments()
  }
}

impl<'a, S: AsRef<str>> IntoUriPath for &'a [S] {
  fn into_segments(self) -> Vec<String> {
    self.iter().map(|seg| seg.as_ref().to_string()).collect()
  }
}

impl<S: AsRef<str>> IntoUriPath for Vec<S> {
  fn into_segments(self) -> Vec<String> {
    self.as_slice().into_segments()
  }
}

impl<S: AsRef<str>, const N: usize> IntoUriPath for [S; N] {
  fn into_segments(self) -> Vec<String> {
    self.as_slice().into_segments()
  }
}

/// Join path segments into `/a/b/c` form, skipping empty segments.
///
/// Yields `None` when there is no non-empty segment.
pub(crate) fn join<I, S>(segments: I) -> Option<String>
  where I: IntoIterator<Item = S>,
        S: AsRef<str>
{
  let path = segments.into_iter()
                     .filter(|seg| !seg.as_ref().is_empty())
                     .fold(String::new(), |mut path, seg| {
                       path.push('/');
                       path.push_str(seg.as_ref());
                       path
                     });

  Some(path).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split() {
    assert_eq!("a/b/c".into_segments(), vec!["a", "b", "c"]);
    assert_eq!("/".into_segments(), Vec::<String>::new());
    assert_eq!(String::from("//x").into_segments(), vec!["x"]);
  }

  #[test]
  fn lists_keep_empty_segments() {
    assert_eq!(vec!["a", "", "c"].into_segments(), vec!["a", "", "c"]);
  }

  #[test]
  fn joined() {
    assert_eq!(join(["a", "b", "c"]), Some("/a/b/c".into()));
    assert_eq!(join(["a", "", "c"]), Some("/a/c".into()));
    assert_eq!(join(Vec::<String>::new()), None);
    assert_eq!(join([""]), None);
  }
}

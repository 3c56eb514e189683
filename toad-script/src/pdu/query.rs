use tinyvec::ArrayVec;
use toad_pdu::opt::known::no;
use toad_pdu::Value;

use super::options::Options;
use crate::error::Error;

/// Maximum number of names a [`QueryParams`] iterator may filter on
pub const MAX_FILTER_NAMES: usize = 10;

/// A `name[=value]` pair parsed from a `Uri-Query` option
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryParam {
  /// Parameter name, with surrounding whitespace trimmed
  pub name: String,
  /// Parameter value, with surrounding whitespace trimmed.
  ///
  /// `None` when there was no `=` or nothing followed it.
  pub value: Option<String>,
}

impl QueryParam {
  /// Parse a single `Uri-Query` option.
  ///
  /// Splits on the first `=`. Yields `None` for a parameter with an empty name.
  ///
  /// ```
  /// use toad_script::pdu::QueryParam;
  ///
  /// assert_eq!(QueryParam::parse(" a = b=c "),
  ///            Some(QueryParam { name: "a".into(),
  ///                              value: Some("b=c".into()) }));
  /// assert_eq!(QueryParam::parse("flag"),
  ///            Some(QueryParam { name: "flag".into(),
  ///                              value: None }));
  /// assert_eq!(QueryParam::parse(" =x"), None);
  /// ```
  pub fn parse(query: &str) -> Option<Self> {
    let (name, value) = match query.split_once('=') {
      | Some((name, value)) => (name, Some(value)),
      | None => (query, None),
    };

    let name = name.trim_matches(|c: char| c.is_ascii_whitespace());
    let value = value.map(|v| v.trim_matches(|c: char| c.is_ascii_whitespace()))
                     .filter(|v| !v.is_empty());

    if name.is_empty() {
      None
    } else {
      Some(QueryParam { name: name.to_string(),
                        value: value.map(String::from) })
    }
  }
}

/// Iterator over the query string parameters of a PDU,
/// optionally restricted to a set of parameter names.
///
/// Created by [`Pdu::qstr_params`](crate::Pdu::qstr_params).
#[derive(Debug)]
pub struct QueryParams {
  opts: Options,
  names: ArrayVec<[String; MAX_FILTER_NAMES]>,
}

impl QueryParams {
  pub(crate) fn new<S: AsRef<str>>(opts: Options, names: &[S]) -> Result<Self, Error> {
    if names.len() > MAX_FILTER_NAMES {
      return Err(Error::invalid_argument(format!("at most {} query parameter names may be given, got {}",
                                                 MAX_FILTER_NAMES,
                                                 names.len())));
    }

    let names = names.iter().map(|n| n.as_ref().to_string()).collect();
    Ok(Self { opts, names })
  }

  fn wanted(&self, param: &QueryParam) -> bool {
    self.names.is_empty() || self.names.iter().any(|n| n == &param.name)
  }
}

impl Iterator for QueryParams {
  type Item = QueryParam;

  fn next(&mut self) -> Option<QueryParam> {
    loop {
      let param = match self.opts.next()? {
        | (no::URI_QUERY, Value::Str(query)) => QueryParam::parse(&query),
        | _ => None,
      };

      match param {
        | Some(param) if self.wanted(&param) => break Some(param),
        | _ => continue,
      }
    }
  }
}

impl core::iter::FusedIterator for QueryParams {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trims_ascii_whitespace() {
    assert_eq!(QueryParam::parse("\tprm3 = 3 \n"),
               Some(QueryParam { name: "prm3".into(),
                                 value: Some("3".into()) }));
    assert_eq!(QueryParam::parse("a=  "),
               Some(QueryParam { name: "a".into(),
                                 value: None }));
  }

  #[test]
  fn empty_name_skipped() {
    assert_eq!(QueryParam::parse(""), None);
    assert_eq!(QueryParam::parse("="), None);
  }
}

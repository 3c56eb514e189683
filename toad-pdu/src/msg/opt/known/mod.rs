/// Content-Format values
pub mod content_format;
pub use content_format::*;

use crate::OptNumber;

macro_rules! opt {
  (rfc7252($section:literal) $name:ident = $n:literal) => {
    #[doc = ::toad_macros::rfc_7252_doc!($section)]
    pub const $name: crate::OptNumber = crate::OptNumber($n);
  };
  (#[doc = $doc:expr] $name:ident = $n:literal) => {
    #[doc = $doc]
    pub const $name: crate::OptNumber = crate::OptNumber($n);
  };
}

/// Registered option numbers
pub mod no {
  opt!(rfc7252("5.10.8.1") IF_MATCH = 1);
  opt!(rfc7252("5.10.1") URI_HOST = 3);
  opt!(#[doc = concat!(
                toad_macros::rfc_7252_doc!("5.10.6"),
                "\n<details><summary>ETag as a Request Option</summary>\n\n",
                toad_macros::rfc_7252_doc!("5.10.6.2"),
                "\n</details><details><summary>ETag as a Response Option</summary>\n\n",
                toad_macros::rfc_7252_doc!("5.10.6.1"),
                "</details>"
      )]
       ETAG = 4);
  opt!(rfc7252("5.10.8.2") IF_NONE_MATCH = 5);
  opt!(#[doc = "Observe (RFC 7641); registers or deregisters interest in a resource"]
       OBSERVE = 6);
  opt!(#[doc = "See [`URI_HOST`]"]
       URI_PORT = 7);
  opt!(rfc7252("5.10.7") LOCATION_PATH = 8);
  opt!(#[doc = "See [`URI_HOST`]"]
       URI_PATH = 11);
  opt!(rfc7252("5.10.3") CONTENT_FORMAT = 12);
  opt!(rfc7252("5.10.5") MAX_AGE = 14);
  opt!(#[doc = "See [`URI_HOST`]"]
       URI_QUERY = 15);
  opt!(rfc7252("5.10.4") ACCEPT = 17);
  opt!(#[doc = "See [`LOCATION_PATH`]"]
       LOCATION_QUERY = 20);
  opt!(#[doc = "Block2 (RFC 7959); block-wise transfer of a response payload"]
       BLOCK2 = 23);
  opt!(#[doc = "Block1 (RFC 7959); block-wise transfer of a request payload"]
       BLOCK1 = 27);
  opt!(#[doc = "Size2 (RFC 7959); total size of a block-wise response payload"]
       SIZE2 = 28);
  opt!(rfc7252("5.10.2") PROXY_URI = 35);
  opt!(#[doc = "See [`PROXY_URI`]"]
       PROXY_SCHEME = 39);
  opt!(rfc7252("5.10.9") SIZE1 = 60);
  opt!(#[doc = "No-Response (RFC 7967); suppresses responses of the given classes"]
       NO_RESPONSE = 258);
}

/// Registered name of an option number
pub fn name(n: OptNumber) -> Option<&'static str> {
  let name = match n {
    | no::IF_MATCH => "If-Match",
    | no::URI_HOST => "Uri-Host",
    | no::ETAG => "ETag",
    | no::IF_NONE_MATCH => "If-None-Match",
    | no::OBSERVE => "Observe",
    | no::URI_PORT => "Uri-Port",
    | no::LOCATION_PATH => "Location-Path",
    | no::URI_PATH => "Uri-Path",
    | no::CONTENT_FORMAT => "Content-Format",
    | no::MAX_AGE => "Max-Age",
    | no::URI_QUERY => "Uri-Query",
    | no::ACCEPT => "Accept",
    | no::LOCATION_QUERY => "Location-Query",
    | no::BLOCK2 => "Block2",
    | no::BLOCK1 => "Block1",
    | no::SIZE2 => "Size2",
    | no::PROXY_URI => "Proxy-Uri",
    | no::PROXY_SCHEME => "Proxy-Scheme",
    | no::SIZE1 => "Size1",
    | no::NO_RESPONSE => "No-Response",
    | _ => return None,
  };

  Some(name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registry_numbers() {
    assert_eq!([no::IF_MATCH,
                no::URI_HOST,
                no::ETAG,
                no::IF_NONE_MATCH,
                no::OBSERVE,
                no::URI_PORT,
                no::LOCATION_PATH,
                no::URI_PATH,
                no::CONTENT_FORMAT,
                no::MAX_AGE,
                no::URI_QUERY,
                no::ACCEPT,
                no::LOCATION_QUERY,
                no::BLOCK2,
                no::BLOCK1,
                no::SIZE2,
                no::PROXY_URI,
                no::PROXY_SCHEME,
                no::SIZE1,
                no::NO_RESPONSE].map(|n| n.0),
               [1, 3, 4, 5, 6, 7, 8, 11, 12, 14, 15, 17, 20, 23, 27, 28, 35, 39, 60, 258]);
  }

  #[test]
  fn names() {
    assert_eq!(name(OptNumber(15)), Some("Uri-Query"));
    assert_eq!(name(OptNumber(258)), Some("No-Response"));
    assert_eq!(name(OptNumber(2)), None);
  }
}

//! Method, response & signaling codes

pub use toad_pdu::Code;

macro_rules! code {
  (rfc7252($section:literal) $name:ident = $c:literal . $d:literal) => {
    #[doc = toad_macros::rfc_7252_doc!($section)]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: toad_pdu::Code = toad_pdu::Code::new($c, $d);
  };
  (#[doc = $doc:expr] $name:ident = $c:literal . $d:literal) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: toad_pdu::Code = toad_pdu::Code::new($c, $d);
  };
}

// 0.xx
code!(rfc7252("5.8.1") GET    = 0 . 01);
code!(rfc7252("5.8.2") POST   = 0 . 02);
code!(rfc7252("5.8.3") PUT    = 0 . 03);
code!(rfc7252("5.8.4") DELETE = 0 . 04);
code!(#[doc = "[FETCH](https://www.rfc-editor.org/rfc/rfc8132#section-2); a GET with a request body"]
      FETCH  = 0 . 05);
code!(#[doc = "[PATCH](https://www.rfc-editor.org/rfc/rfc8132#section-3); apply a set of changes"]
      PATCH  = 0 . 06);
code!(#[doc = "[iPATCH](https://www.rfc-editor.org/rfc/rfc8132#section-3); idempotent [`PATCH`]"]
      IPATCH = 0 . 07);

// 2.xx
code!(rfc7252("5.9.1.1") CREATED = 2 . 01);
code!(rfc7252("5.9.1.2") DELETED = 2 . 02);
code!(rfc7252("5.9.1.3") VALID   = 2 . 03);
code!(rfc7252("5.9.1.4") CHANGED = 2 . 04);
code!(rfc7252("5.9.1.5") CONTENT = 2 . 05);
code!(
      #[doc = concat!(
    "## [2.31 Continue](https://www.rfc-editor.org/rfc/rfc7959#section-2.9.1)\n",
    "This success status code indicates that the transfer of this\n",
    "block of the request body was successful and that the server\n",
    "encourages sending further blocks.",
  )]
      CONTINUE = 2 . 31
);

// 4.xx
code!(rfc7252("5.9.2.1")  BAD_REQUEST                = 4 . 00);
code!(rfc7252("5.9.2.2")  UNAUTHORIZED               = 4 . 01);
code!(rfc7252("5.9.2.3")  BAD_OPTION                 = 4 . 02);
code!(rfc7252("5.9.2.4")  FORBIDDEN                  = 4 . 03);
code!(rfc7252("5.9.2.5")  NOT_FOUND                  = 4 . 04);
code!(rfc7252("5.9.2.6")  METHOD_NOT_ALLOWED         = 4 . 05);
code!(rfc7252("5.9.2.7")  NOT_ACCEPTABLE             = 4 . 06);
code!(
      #[doc = concat!(
    "## [4.08 Request Entity Incomplete](https://www.rfc-editor.org/rfc/rfc7959#section-2.9.2)\n",
    "The server has not received the blocks of the request body that it needs to proceed.",
  )]
      REQUEST_ENTITY_INCOMPLETE = 4 . 08
);
code!(rfc7252("5.9.2.8")  PRECONDITION_FAILED        = 4 . 12);
code!(rfc7252("5.9.2.9")  REQUEST_ENTITY_TOO_LARGE   = 4 . 13);
code!(rfc7252("5.9.2.10") UNSUPPORTED_CONTENT_FORMAT = 4 . 15);
code!(#[doc = "[4.29 Too Many Requests](https://www.rfc-editor.org/rfc/rfc8516#section-3)"]
      TOO_MANY_REQUESTS = 4 . 29);

// 5.xx
code!(rfc7252("5.9.3.1") INTERNAL_SERVER_ERROR  = 5 . 00);
code!(rfc7252("5.9.3.2") NOT_IMPLEMENTED        = 5 . 01);
code!(rfc7252("5.9.3.3") BAD_GATEWAY            = 5 . 02);
code!(rfc7252("5.9.3.4") SERVICE_UNAVAILABLE    = 5 . 03);
code!(rfc7252("5.9.3.5") GATEWAY_TIMEOUT        = 5 . 04);
code!(rfc7252("5.9.3.6") PROXYING_NOT_SUPPORTED = 5 . 05);

// 7.xx
code!(#[doc = "[7.01 CSM](https://www.rfc-editor.org/rfc/rfc8323#section-5.3); capabilities and settings"]
      CSM     = 7 . 01);
code!(#[doc = "[7.02 Ping](https://www.rfc-editor.org/rfc/rfc8323#section-5.4)"]
      PING    = 7 . 02);
code!(#[doc = "[7.03 Pong](https://www.rfc-editor.org/rfc/rfc8323#section-5.4)"]
      PONG    = 7 . 03);
code!(#[doc = "[7.04 Release](https://www.rfc-editor.org/rfc/rfc8323#section-5.5)"]
      RELEASE = 7 . 04);
code!(#[doc = "[7.05 Abort](https://www.rfc-editor.org/rfc/rfc8323#section-5.6)"]
      ABORT   = 7 . 05);

/// The response code a server answers a request with
/// when the handler did not choose one.
///
/// ```
/// use toad_script::code::{self, default_response_code, Code};
///
/// assert_eq!(default_response_code(code::GET), code::CONTENT);
/// assert_eq!(default_response_code(code::PUT), code::CREATED);
/// assert_eq!(default_response_code(Code::new(0, 30)), Code::EMPTY);
/// ```
pub fn default_response_code(method: Code) -> Code {
  match method {
    | GET | FETCH => CONTENT,
    | POST | PATCH | IPATCH => CHANGED,
    | PUT => CREATED,
    | DELETE => DELETED,
    | _ => Code::EMPTY,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_values() {
    assert_eq!([GET, POST, PUT, DELETE, FETCH, PATCH, IPATCH].map(|c| c.to_decimal()),
               [1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(CONTINUE.to_decimal(), 231);
    assert_eq!(REQUEST_ENTITY_INCOMPLETE.to_decimal(), 408);
    assert_eq!(TOO_MANY_REQUESTS.to_decimal(), 429);
    assert_eq!(PROXYING_NOT_SUPPORTED.to_decimal(), 505);
    assert_eq!(ABORT.to_decimal(), 705);
  }

  #[test]
  fn defaults() {
    assert_eq!(default_response_code(FETCH), CONTENT);
    assert_eq!(default_response_code(POST), CHANGED);
    assert_eq!(default_response_code(PATCH), CHANGED);
    assert_eq!(default_response_code(IPATCH), CHANGED);
    assert_eq!(default_response_code(DELETE), DELETED);
    assert_eq!(default_response_code(CONTENT), Code::EMPTY);
  }
}

/// Content-Format
///
/// Numbers follow the IANA "CoAP Content-Formats" registry.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentFormat {
  /// `text/plain; charset=utf-8`
  Text,
  /// `application/cose; cose-type="cose-encrypt0"`
  CoseEncrypt0,
  /// `application/cose; cose-type="cose-mac0"`
  CoseMac0,
  /// `application/cose; cose-type="cose-sign1"`
  CoseSign1,
  /// `application/link-format`
  LinkFormat,
  /// `application/xml`
  Xml,
  /// `application/octet-stream`
  OctetStream,
  /// `application/exi`
  Exi,
  /// `application/json`
  Json,
  /// `application/json-patch+json`
  JsonPatch,
  /// `application/merge-patch+json`
  MergePatch,
  /// `application/cbor`
  Cbor,
  /// `application/cwt`
  Cwt,
  /// `application/senml+json`
  SenmlJson,
  /// `application/senml+cbor`
  SenmlCbor,
  /// `application/yang-patch+json`
  YangPatchJson,
  /// `application/coap-group+json`
  CoapGroupJson,
  /// Another content format
  Other(u16),
}

impl ContentFormat {
  /// Convert this content format to the CoAP byte value
  pub fn bytes(&self) -> [u8; 2] {
    u16::from(self).to_be_bytes()
  }

  /// The media type this content format stands for, if it is registered
  ///
  /// ```
  /// use toad_pdu::ContentFormat;
  ///
  /// assert_eq!(ContentFormat::from(50).media_type(), Some("application/json"));
  /// assert_eq!(ContentFormat::from(9999).media_type(), None);
  /// ```
  pub fn media_type(&self) -> Option<&'static str> {
    use ContentFormat::*;
    let ty = match self {
      | Text => "text/plain; charset=utf-8",
      | CoseEncrypt0 => "application/cose; cose-type=\"cose-encrypt0\"",
      | CoseMac0 => "application/cose; cose-type=\"cose-mac0\"",
      | CoseSign1 => "application/cose; cose-type=\"cose-sign1\"",
      | LinkFormat => "application/link-format",
      | Xml => "application/xml",
      | OctetStream => "application/octet-stream",
      | Exi => "application/exi",
      | Json => "application/json",
      | JsonPatch => "application/json-patch+json",
      | MergePatch => "application/merge-patch+json",
      | Cbor => "application/cbor",
      | Cwt => "application/cwt",
      | SenmlJson => "application/senml+json",
      | SenmlCbor => "application/senml+cbor",
      | YangPatchJson => "application/yang-patch+json",
      | CoapGroupJson => "application/coap-group+json",
      | Other(_) => return None,
    };

    Some(ty)
  }
}

impl<'a> From<&'a ContentFormat> for u16 {
  fn from(f: &'a ContentFormat) -> Self {
    use ContentFormat::*;
    match *f {
      | Text => 0,
      | CoseEncrypt0 => 16,
      | CoseMac0 => 17,
      | CoseSign1 => 18,
      | LinkFormat => 40,
      | Xml => 41,
      | OctetStream => 42,
      | Exi => 47,
      | Json => 50,
      | JsonPatch => 51,
      | MergePatch => 52,
      | Cbor => 60,
      | Cwt => 61,
      | SenmlJson => 110,
      | SenmlCbor => 112,
      | YangPatchJson => 140,
      | CoapGroupJson => 256,
      | Other(n) => n,
    }
  }
}

impl From<ContentFormat> for u16 {
  fn from(f: ContentFormat) -> Self {
    u16::from(&f)
  }
}

impl From<u16> for ContentFormat {
  fn from(n: u16) -> Self {
    use ContentFormat::*;
    match n {
      | 0 => Text,
      | 16 => CoseEncrypt0,
      | 17 => CoseMac0,
      | 18 => CoseSign1,
      | 40 => LinkFormat,
      | 41 => Xml,
      | 42 => OctetStream,
      | 47 => Exi,
      | 50 => Json,
      | 51 => JsonPatch,
      | 52 => MergePatch,
      | 60 => Cbor,
      | 61 => Cwt,
      | 110 => SenmlJson,
      | 112 => SenmlCbor,
      | 140 => YangPatchJson,
      | 256 => CoapGroupJson,
      | n => Other(n),
    }
  }
}

impl core::fmt::Display for ContentFormat {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self.media_type() {
      | Some(ty) => f.write_str(ty),
      | None => write!(f, "content-format {}", u16::from(self)),
    }
  }
}

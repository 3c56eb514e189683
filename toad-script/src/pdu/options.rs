use toad_pdu::opt::value;
use toad_pdu::{OptCursor, OptNumber, Value};

use super::Pdu;

/// Iterator over the decoded options of a [`Pdu`], in wire order.
///
/// Created by [`Pdu::options`].
///
/// Options are read one at a time from the PDU; the iterator
/// ends early if the PDU is locked or its options are malformed.
#[derive(Debug)]
pub struct Options {
  pdu: Pdu,
  filter: Vec<OptNumber>,
  cursor: OptCursor,
}

impl Options {
  pub(crate) fn new(pdu: Pdu, filter: Vec<OptNumber>) -> Self {
    Self { pdu,
           filter,
           cursor: OptCursor::new() }
  }
}

impl Iterator for Options {
  type Item = (OptNumber, Value);

  fn next(&mut self) -> Option<Self::Item> {
    let Self { pdu, filter, cursor } = self;

    loop {
      let next = pdu.read(|m| {
                      cursor.next(m.opts.as_bytes())
                            .map(|opt| opt.map(|(n, v)| (n, value::decode(n, v))))
                    })
                    .ok()
                    .flatten();

      match next {
        | None => break None,
        | Some(Err(e)) => {
          log::warn!("malformed options, stopping iteration: {}", e);
          break None;
        },
        | Some(Ok((n, _))) if !filter.is_empty() && !filter.contains(&n) => continue,
        | Some(Ok(opt)) => break Some(opt),
      }
    }
  }
}

impl core::iter::FusedIterator for Options {}

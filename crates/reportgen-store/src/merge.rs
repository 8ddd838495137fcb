use std::collections::HashSet;

use reportgen_protocol::Message;

/// Reconciles a locally held message sequence against a freshly fetched
/// authoritative one.
///
/// The rule is asymmetric on purpose: the first local message is the user's
/// original prompt, the trigger for planning and generation, and must never
/// flicker away, even if the server response is momentarily inconsistent.
/// Every other id-less local message is disposable scaffolding superseded by
/// the fetch. Locals that already carry a server id are kept and used to
/// dedup the authoritative list; server messages without an id are always
/// kept, since the server only omits an id for messages it does not yet
/// consider final.
pub fn merge_messages(local: &[Message], authoritative: Vec<Message>) -> Vec<Message> {
    let mut preserved: Vec<Message> = Vec::new();
    for (index, message) in local.iter().enumerate() {
        if index == 0 || message.id.is_some() {
            preserved.push(message.clone());
        }
    }

    let preserved_ids: HashSet<_> = preserved
        .iter()
        .filter_map(|message| message.id)
        .collect();

    let mut merged = preserved;
    merged.extend(
        authoritative
            .into_iter()
            .filter(|message| match message.id {
                Some(id) => !preserved_ids.contains(&id),
                None => true,
            }),
    );
    merged
}

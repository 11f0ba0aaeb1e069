//! Section splitting for decompressed snapshots
//!
//! A decompressed snapshot is one long reply-style text in which bare marker
//! tokens delimit the sections:
//!
//! ```text
//! virtualserver_name=Test end_virtualserver begin_channels channel_id=1|channel_id=2 end_channels
//! begin_permissions server_groups id=6 name=Admin permid=b_x permvalue=1 end_group|end_groups ...
//! ```
//!
//! Markers are matched as whole tokens, so `client_flat` never matches inside
//! `channel_client_flat`. A marker that is missing yields an empty section.

use squery_core::{split_response, unmarshal_response, FieldMap, Unmarshal};

use crate::error::{Result, SnapshotError};
use crate::model::{
    ChannelGroupRelation, GroupHeader, GroupPermission, ServerGroupRelation, Snapshot,
    SnapshotGroup,
};

/// Bare tokens that open or close a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    EndVirtualServer,
    BeginChannels,
    EndChannels,
    BeginClients,
    EndClients,
    BeginPermissions,
    EndPermissions,
    ServerGroups,
    ChannelGroups,
    EndGroup,
    EndGroups,
    EndRelations,
    ClientFlat,
    ChannelFlat,
    ChannelClientFlat,
    EndFlat,
    BeginApiKeys,
    EndApiKeys,
}

impl Marker {
    const ALL: [Marker; 18] = [
        Marker::EndVirtualServer,
        Marker::BeginChannels,
        Marker::EndChannels,
        Marker::BeginClients,
        Marker::EndClients,
        Marker::BeginPermissions,
        Marker::EndPermissions,
        Marker::ServerGroups,
        Marker::ChannelGroups,
        Marker::EndGroup,
        Marker::EndGroups,
        Marker::EndRelations,
        Marker::ClientFlat,
        Marker::ChannelFlat,
        Marker::ChannelClientFlat,
        Marker::EndFlat,
        Marker::BeginApiKeys,
        Marker::EndApiKeys,
    ];

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Marker::EndVirtualServer => "end_virtualserver",
            Marker::BeginChannels => "begin_channels",
            Marker::EndChannels => "end_channels",
            Marker::BeginClients => "begin_clients",
            Marker::EndClients => "end_clients",
            Marker::BeginPermissions => "begin_permissions",
            Marker::EndPermissions => "end_permissions",
            Marker::ServerGroups => "server_groups",
            Marker::ChannelGroups => "channel_groups",
            Marker::EndGroup => "end_group",
            Marker::EndGroups => "end_groups",
            Marker::EndRelations => "end_relations",
            Marker::ClientFlat => "client_flat",
            Marker::ChannelFlat => "channel_flat",
            Marker::ChannelClientFlat => "channel_client_flat",
            Marker::EndFlat => "end_flat",
            Marker::BeginApiKeys => "begin_apikeys",
            Marker::EndApiKeys => "end_apikeys",
        }
    }

    fn from_token(token: &str) -> Option<Marker> {
        Marker::ALL.iter().copied().find(|m| m.as_str() == token)
    }
}

/// One element of a tokenized snapshot
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Object(FieldMap),
    Marker(Marker),
}

/// Break the snapshot text into objects and markers, in order
///
/// Marker tokens are removed from the objects they appear in and split them
/// in two; objects left without any field are dropped.
pub(crate) fn tokenize(text: &str) -> Vec<Item> {
    fn flush(current: &mut String, items: &mut Vec<Item>) {
        if current.is_empty() {
            return;
        }
        if let Some(fields) = split_response(current).pop() {
            if !fields.is_empty() {
                items.push(Item::Object(fields));
            }
        }
        current.clear();
    }

    let mut items = Vec::new();
    let mut current = String::new();

    for object in text.split('|') {
        for token in object.split_whitespace() {
            match Marker::from_token(token) {
                Some(marker) => {
                    flush(&mut current, &mut items);
                    items.push(Item::Marker(marker));
                }
                None => {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(token);
                }
            }
        }
        flush(&mut current, &mut items);
    }

    items
}

fn position(items: &[Item], marker: Marker) -> Option<usize> {
    items.iter().position(|i| *i == Item::Marker(marker))
}

fn last_position(items: &[Item], marker: Marker) -> Option<usize> {
    items.iter().rposition(|i| *i == Item::Marker(marker))
}

/// Objects following `start` up to the next marker
fn objects_after(items: &[Item], start: usize) -> Vec<FieldMap> {
    items[start..]
        .iter()
        .map_while(|item| match item {
            Item::Object(fields) => Some(fields.clone()),
            Item::Marker(_) => None,
        })
        .collect()
}

/// Objects between the first `start` marker and the following `end` marker
fn section(items: &[Item], start: Marker, end: Marker) -> Vec<FieldMap> {
    let Some(begin) = position(items, start) else {
        return Vec::new();
    };
    let objects = objects_after(items, begin + 1);
    let close = begin + 1 + objects.len();
    if items.get(close) != Some(&Item::Marker(end)) {
        tracing::debug!(
            start = start.as_str(),
            end = end.as_str(),
            "unterminated snapshot section"
        );
    }
    objects
}

fn unmarshal_section<T: Unmarshal + Default>(
    section: &'static str,
    objects: &[FieldMap],
) -> Result<T> {
    let mut target = T::default();
    if objects.is_empty() {
        return Ok(target);
    }
    unmarshal_response(objects, &mut target)
        .map_err(|source| SnapshotError::Decode { section, source })?;
    Ok(target)
}

fn parse_groups(items: &[Item], start: Marker, section: &'static str) -> Result<Vec<SnapshotGroup>> {
    let Some(begin) = position(items, start) else {
        return Ok(Vec::new());
    };

    let mut groups = Vec::new();
    let mut objects: Vec<FieldMap> = Vec::new();
    for item in &items[begin + 1..] {
        match item {
            Item::Object(fields) => objects.push(fields.clone()),
            Item::Marker(Marker::EndGroup) => {
                if !objects.is_empty() {
                    groups.push(parse_group(section, &objects)?);
                }
                objects.clear();
            }
            Item::Marker(_) => break,
        }
    }
    if !objects.is_empty() {
        groups.push(parse_group(section, &objects)?);
    }
    Ok(groups)
}

/// The first object carries `id` and `name` and usually the first permission
fn parse_group(section: &'static str, objects: &[FieldMap]) -> Result<SnapshotGroup> {
    let header: GroupHeader = unmarshal_section(section, &objects[..1])?;
    let grants: Vec<FieldMap> = objects
        .iter()
        .filter(|o| o.contains_key("permid"))
        .cloned()
        .collect();
    let permissions: Vec<GroupPermission> = unmarshal_section(section, &grants)?;

    Ok(SnapshotGroup {
        id: header.id,
        name: header.name,
        permissions,
    })
}

/// Relation blocks follow the last `end_groups`, each closed by `end_relations`
///
/// The first block lists server group memberships. Each later block lists
/// the channel group memberships of one channel; its `iid` is carried over
/// to the objects of the block that omit it.
fn parse_relations(
    items: &[Item],
) -> Result<(Vec<ServerGroupRelation>, Vec<ChannelGroupRelation>)> {
    let Some(begin) = last_position(items, Marker::EndGroups) else {
        return Ok((Vec::new(), Vec::new()));
    };

    let mut blocks: Vec<Vec<FieldMap>> = Vec::new();
    let mut cursor = begin + 1;
    loop {
        let objects = objects_after(items, cursor);
        let close = cursor + objects.len();
        if items.get(close) != Some(&Item::Marker(Marker::EndRelations)) {
            break;
        }
        blocks.push(objects);
        cursor = close + 1;
    }

    let mut blocks = blocks.into_iter();
    let server = match blocks.next() {
        Some(objects) => unmarshal_section("server group relations", &objects)?,
        None => Vec::new(),
    };

    let mut channel = Vec::new();
    for mut objects in blocks {
        let iid = objects.iter().find_map(|o| o.get("iid").cloned());
        if let Some(iid) = iid {
            for object in &mut objects {
                object.entry("iid".to_string()).or_insert_with(|| iid.clone());
            }
        }
        let decoded: Vec<ChannelGroupRelation> =
            unmarshal_section("channel group relations", &objects)?;
        channel.extend(decoded);
    }

    Ok((server, channel))
}

/// Decode every section of a decompressed snapshot
pub(crate) fn parse(text: &str) -> Result<Snapshot> {
    let items = tokenize(text);

    let virtual_server = match position(&items, Marker::EndVirtualServer) {
        Some(end) => {
            let objects: Vec<FieldMap> = items[..end]
                .iter()
                .filter_map(|item| match item {
                    Item::Object(fields) => Some(fields.clone()),
                    Item::Marker(_) => None,
                })
                .collect();
            unmarshal_section("virtual server", &objects)?
        }
        None => Default::default(),
    };

    let (server_group_relations, channel_group_relations) = parse_relations(&items)?;

    Ok(Snapshot {
        virtual_server,
        channels: unmarshal_section(
            "channels",
            &section(&items, Marker::BeginChannels, Marker::EndChannels),
        )?,
        clients: unmarshal_section(
            "clients",
            &section(&items, Marker::BeginClients, Marker::EndClients),
        )?,
        server_groups: parse_groups(&items, Marker::ServerGroups, "server groups")?,
        channel_groups: parse_groups(&items, Marker::ChannelGroups, "channel groups")?,
        server_group_relations,
        channel_group_relations,
        client_permissions: unmarshal_section(
            "client permissions",
            &section(&items, Marker::ClientFlat, Marker::EndFlat),
        )?,
        channel_permissions: unmarshal_section(
            "channel permissions",
            &section(&items, Marker::ChannelFlat, Marker::EndFlat),
        )?,
        channel_client_permissions: unmarshal_section(
            "channel client permissions",
            &section(&items, Marker::ChannelClientFlat, Marker::EndFlat),
        )?,
        api_keys: unmarshal_section(
            "api keys",
            &section(&items, Marker::BeginApiKeys, Marker::EndApiKeys),
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_objects_at_markers() {
        let items = tokenize("a=1 end_virtualserver begin_channels channel_id=1|channel_id=2 end_channels");
        assert_eq!(items.len(), 6);
        assert_eq!(items[1], Item::Marker(Marker::EndVirtualServer));
        assert_eq!(items[2], Item::Marker(Marker::BeginChannels));
        match &items[3] {
            Item::Object(fields) => assert_eq!(fields["channel_id"], "1"),
            other => panic!("unexpected item {:?}", other),
        }
        assert_eq!(items[5], Item::Marker(Marker::EndChannels));
    }

    #[test]
    fn test_markers_match_whole_tokens() {
        let items = tokenize("channel_client_flat id1=1 id2=2 permid=x end_flat");
        assert_eq!(items[0], Item::Marker(Marker::ChannelClientFlat));
        assert_eq!(position(&items, Marker::ClientFlat), None);
        assert!(section(&items, Marker::ClientFlat, Marker::EndFlat).is_empty());
        assert_eq!(
            section(&items, Marker::ChannelClientFlat, Marker::EndFlat).len(),
            1
        );
    }

    #[test]
    fn test_marker_with_value_is_a_field() {
        let items = tokenize("end_groups=1");
        assert!(matches!(&items[0], Item::Object(f) if f["end_groups"] == "1"));
    }

    #[test]
    fn test_empty_objects_dropped() {
        let items = tokenize("end_group|end_groups");
        assert_eq!(
            items,
            vec![
                Item::Marker(Marker::EndGroup),
                Item::Marker(Marker::EndGroups)
            ]
        );
    }

    #[test]
    fn test_groups() {
        let text = "server_groups id=6 name=Server\\sAdmin permid=b_a permvalue=1 permskip=0 permnegated=0|\
                    permid=i_b permvalue=75 permskip=1 permnegated=0 end_group|\
                    id=8 name=Guest permid=b_c permvalue=1 permskip=0 permnegated=1 end_group|end_groups";
        let groups = parse_groups(&tokenize(text), Marker::ServerGroups, "server groups").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, 6);
        assert_eq!(groups[0].name, "Server Admin");
        assert_eq!(groups[0].permissions.len(), 2);
        assert_eq!(groups[0].permissions[1].id, "i_b");
        assert_eq!(groups[0].permissions[1].value, 75);
        assert!(groups[0].permissions[1].skip);
        assert!(groups[1].permissions[0].negated);
    }

    #[test]
    fn test_relations() {
        let text = "end_groups iid=0 cldbid=1 gid=6|cldbid=2 gid=8 end_relations \
                    iid=1 cldbid=2 gid=5|cldbid=3 gid=7 end_relations client_flat end_flat";
        let (server, channel) = parse_relations(&tokenize(text)).unwrap();
        assert_eq!(
            server,
            vec![
                ServerGroupRelation { client_db_id: 1, group_id: 6 },
                ServerGroupRelation { client_db_id: 2, group_id: 8 },
            ]
        );
        assert_eq!(channel.len(), 2);
        assert_eq!(channel[1].channel_id, 1);
        assert_eq!(channel[1].client_db_id, 3);
    }

    #[test]
    fn test_missing_markers_give_empty_sections() {
        let snapshot = parse("nothing=here").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_section_decode_error_names_section() {
        let err = parse("begin_clients client_id=abc end_clients").unwrap_err();
        assert!(err.to_string().starts_with("clients: "));
    }
}

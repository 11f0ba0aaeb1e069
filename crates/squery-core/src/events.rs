//! Notification payloads
//!
//! Notifications are registered per category with `servernotifyregister`
//! and arrive as `notify<name> <fields>` lines. Each known notification name
//! has a payload record below; [`Event`] is the sum of all of them.

use std::fmt;

use crate::types::{Codec, GroupList, Reason};

/// Notification names as they appear on the wire
pub mod names {
    pub const SERVER_EDITED: &str = "notifyserveredited";
    pub const CLIENT_LEFT_VIEW: &str = "notifyclientleftview";
    pub const CLIENT_ENTER_VIEW: &str = "notifycliententerview";
    pub const CHANNEL_DESCRIPTION_CHANGED: &str = "notifychanneldescriptionchanged";
    pub const CHANNEL_PASSWORD_CHANGED: &str = "notifychannelpasswordchanged";
    pub const CHANNEL_MOVED: &str = "notifychannelmoved";
    pub const CHANNEL_EDITED: &str = "notifychanneledited";
    pub const CHANNEL_CREATED: &str = "notifychannelcreated";
    pub const CHANNEL_DELETED: &str = "notifychanneldeleted";
    pub const CLIENT_MOVED: &str = "notifyclientmoved";
    pub const TEXT_MESSAGE: &str = "notifytextmessage";
    pub const TOKEN_USED: &str = "notifytokenused";
}

/// Registration category for `servernotifyregister event=<category>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// client enter/left view and server edited events
    Server,
    /// channel events, scoped to one channel id (0 = all channels)
    Channel,
    /// text messages sent to the whole server
    TextServer,
    /// text messages in the channel the query client is in
    TextChannel,
    /// text messages sent directly to the query client
    TextPrivate,
    /// privilege key use
    TokenUsed,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Server => "server",
            EventCategory::Channel => "channel",
            EventCategory::TextServer => "textserver",
            EventCategory::TextChannel => "textchannel",
            EventCategory::TextPrivate => "textprivate",
            EventCategory::TokenUsed => "tokenused",
        }
    }

    /// Only the channel category accepts an `id` scope
    pub fn is_scoped(&self) -> bool {
        matches!(self, EventCategory::Channel)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

crate::record! {
    /// A text message was received
    pub struct TextMessageEvent {
        /// 1 = private, 2 = channel, 3 = server
        pub target_mode: u8 => "targetmode",
        pub message: String => "msg",
        /// Only set for private messages
        pub target: u32 => "target",
        /// 0 for server messages
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
    }
}

crate::record! {
    /// A privilege key was used
    pub struct TokenUsedEvent {
        pub client_id: u32 => "clid",
        pub client_db_id: u32 => "cldbid",
        pub client_uid: String => "cluid",
        pub token: String => "token",
        pub token_custom_set: String => "tokencustomset",
        pub token1: String => "token1",
        pub token2: u32 => "token2",
    }
}

crate::record! {
    pub struct ClientMovedEvent {
        pub to: u32 => "ctid",
        pub reason: Option<Reason> => "reasonid",
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
        pub client_id: u32 => "clid",
    }
}

crate::record! {
    pub struct ChannelEditedEvent {
        pub channel_id: u32 => "cid",
        pub reason: Option<Reason> => "reasonid",
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
        pub name: String => "channel_name",
        pub topic: String => "channel_topic",
        pub codec: Option<Codec> => "channel_codec",
        pub codec_quality: u32 => "channel_codec_quality",
        pub max_clients: i32 => "channel_maxclients",
        pub max_family_clients: i32 => "channel_maxfamilyclients",
        pub order: u32 => "channel_order",
        pub permanent: bool => "channel_flag_permanent",
        pub semi_permanent: bool => "channel_flag_semi_permanent",
        pub default: bool => "channel_flag_default",
        pub password: bool => "channel_flag_password",
        pub codec_latency_factor: u32 => "channel_codec_latency_factor",
        pub codec_is_unencrypted: bool => "channel_codec_is_unencrypted",
        pub delete_delay: u32 => "channel_delete_delay",
        pub clients_unlimited: bool => "channel_flag_maxclients_unlimited",
        pub family_clients_unlimited: bool => "channel_flag_maxfamilyclients_unlimited",
        pub max_family_clients_inherited: bool => "channel_flag_maxfamilyclients_inherited",
        pub needed_talk_power: i32 => "channel_needed_talk_power",
        pub name_phonetic: String => "channel_name_phonetic",
        pub icon_id: i64 => "channel_icon_id",
    }
}

crate::record! {
    pub struct ChannelDeletedEvent {
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
        pub channel_id: u32 => "cid",
    }
}

crate::record! {
    /// Only sent when subscribed to all channels (id 0)
    pub struct ChannelCreatedEvent {
        pub channel_id: u32 => "cid",
        pub parent_id: u32 => "cpid",
        pub name: String => "channel_name",
        pub topic: String => "channel_topic",
        pub codec: Option<Codec> => "channel_codec",
        pub codec_quality: u32 => "channel_codec_quality",
        pub max_clients: i32 => "channel_maxclients",
        pub max_family_clients: i32 => "channel_maxfamilyclients",
        pub order: u32 => "channel_order",
        pub permanent: bool => "channel_flag_permanent",
        pub semi_permanent: bool => "channel_flag_semi_permanent",
        pub default: bool => "channel_flag_default",
        pub password: bool => "channel_flag_password",
        pub codec_latency_factor: u32 => "channel_codec_latency_factor",
        pub codec_is_unencrypted: bool => "channel_codec_is_unencrypted",
        pub delete_delay: u32 => "channel_delete_delay",
        pub clients_unlimited: bool => "channel_flag_maxclients_unlimited",
        pub family_clients_unlimited: bool => "channel_flag_maxfamilyclients_unlimited",
        pub max_family_clients_inherited: bool => "channel_flag_maxfamilyclients_inherited",
        pub needed_talk_power: i32 => "channel_needed_talk_power",
        pub name_phonetic: String => "channel_name_phonetic",
        pub icon_id: i64 => "channel_icon_id",
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
    }
}

crate::record! {
    pub struct ChannelMovedEvent {
        pub channel_id: u32 => "cid",
        pub parent_id: u32 => "cpid",
        pub order: u32 => "order",
        pub reason: Option<Reason> => "reasonid",
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
    }
}

crate::record! {
    pub struct ChannelDescriptionChangedEvent {
        pub channel_id: u32 => "cid",
    }
}

crate::record! {
    /// Sent when a password is set or removed, not when it changes
    pub struct ChannelPasswordChangedEvent {
        pub channel_id: u32 => "cid",
    }
}

crate::record! {
    pub struct ServerEditedEvent {
        pub reason: Option<Reason> => "reasonid",
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
        pub name: String => "virtualserver_name",
        pub codec_encryption_mode: String => "virtualserver_codec_encryption_mode",
        pub default_server_group: u32 => "virtualserver_default_server_group",
        pub default_channel_group: u32 => "virtualserver_default_channel_group",
        pub hostbanner_url: String => "virtualserver_hostbanner_url",
        pub hostbanner_gfx_url: String => "virtualserver_hostbanner_gfx_url",
        pub hostbanner_gfx_interval: u32 => "virtualserver_hostbanner_gfx_interval",
        pub priority_speaker_dimm_modificator: f32 => "virtualserver_priority_speaker_dimm_modificator",
        pub hostbutton_tooltip: String => "virtualserver_hostbutton_tooltip",
        pub hostbutton_url: String => "virtualserver_hostbutton_url",
        pub hostbutton_gfx_url: String => "virtualserver_hostbutton_gfx_url",
        pub name_phonetic: String => "virtualserver_name_phonetic",
        pub icon_id: i64 => "virtualserver_icon_id",
        pub hostbanner_mode: String => "virtualserver_hostbanner_mode",
        pub temp_channel_default_delete_delay: u32 => "virtualserver_channel_temp_delete_delay_default",
    }
}

crate::record! {
    pub struct ClientLeftViewEvent {
        pub from: u32 => "cfid",
        pub to: u32 => "ctid",
        pub reason: Option<Reason> => "reasonid",
        pub invoker_id: u32 => "invokerid",
        pub invoker_name: String => "invokername",
        pub invoker_uid: String => "invokeruid",
        pub reason_message: String => "reasonmsg",
        pub ban_time: u64 => "bantime",
        pub client_id: u32 => "clid",
    }
}

crate::record! {
    pub struct ClientEnterViewEvent {
        pub from: u32 => "cfid",
        pub to: u32 => "ctid",
        pub reason: Option<Reason> => "reasonid",
        pub client_id: u32 => "clid",
        pub uid: String => "client_unique_identifier",
        pub nickname: String => "client_nickname",
        pub input_muted: bool => "client_input_muted",
        pub output_muted: bool => "client_output_muted",
        pub output_only_muted: bool => "client_outputonly_muted",
        pub input_hardware: bool => "client_input_hardware",
        pub output_hardware: bool => "client_output_hardware",
        pub is_recording: bool => "client_is_recording",
        pub database_id: u32 => "client_database_id",
        pub channel_group_id: u32 => "client_channel_group_id",
        pub server_groups: GroupList => "client_servergroups",
        pub away: bool => "client_away",
        pub away_message: String => "client_away_message",
        /// 1 for query clients
        pub is_server_query: bool => "client_type",
        pub avatar_flag: String => "client_flag_avatar",
        pub talk_power: i32 => "client_talk_power",
        pub talk_request: bool => "client_talk_request",
        pub talk_request_message: String => "client_talk_request_msg",
        pub description: String => "client_description",
        pub is_talker: bool => "client_is_talker",
        pub is_priority_speaker: bool => "client_is_priority_speaker",
        pub nickname_phonetic: String => "client_nickname_phonetic",
        pub needed_serverquery_view_power: i32 => "client_needed_serverquery_view_power",
        pub icon_id: i64 => "client_icon_id",
        pub is_channel_commander: bool => "client_is_channel_commander",
        pub country: String => "client_country",
        pub channel_group_inherited_channel_id: u32 => "client_channel_group_inherited_channel_id",
        pub badges: String => "client_badges",
    }
}

/// Any known notification payload
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ServerEdited(ServerEditedEvent),
    ClientEnterView(ClientEnterViewEvent),
    ClientLeftView(ClientLeftViewEvent),
    ClientMoved(ClientMovedEvent),
    ChannelCreated(ChannelCreatedEvent),
    ChannelDeleted(ChannelDeletedEvent),
    ChannelEdited(ChannelEditedEvent),
    ChannelMoved(ChannelMovedEvent),
    ChannelDescriptionChanged(ChannelDescriptionChangedEvent),
    ChannelPasswordChanged(ChannelPasswordChangedEvent),
    TextMessage(TextMessageEvent),
    TokenUsed(TokenUsedEvent),
}

impl Event {
    /// Wire name of the notification this payload came from
    pub fn name(&self) -> &'static str {
        match self {
            Event::ServerEdited(_) => names::SERVER_EDITED,
            Event::ClientEnterView(_) => names::CLIENT_ENTER_VIEW,
            Event::ClientLeftView(_) => names::CLIENT_LEFT_VIEW,
            Event::ClientMoved(_) => names::CLIENT_MOVED,
            Event::ChannelCreated(_) => names::CHANNEL_CREATED,
            Event::ChannelDeleted(_) => names::CHANNEL_DELETED,
            Event::ChannelEdited(_) => names::CHANNEL_EDITED,
            Event::ChannelMoved(_) => names::CHANNEL_MOVED,
            Event::ChannelDescriptionChanged(_) => names::CHANNEL_DESCRIPTION_CHANGED,
            Event::ChannelPasswordChanged(_) => names::CHANNEL_PASSWORD_CHANGED,
            Event::TextMessage(_) => names::TEXT_MESSAGE,
            Event::TokenUsed(_) => names::TOKEN_USED,
        }
    }
}

macro_rules! impl_event_from {
    ($($variant:ident => $payload:ty),* $(,)?) => {$(
        impl From<$payload> for Event {
            fn from(e: $payload) -> Self {
                Event::$variant(e)
            }
        }
    )*};
}

impl_event_from! {
    ServerEdited => ServerEditedEvent,
    ClientEnterView => ClientEnterViewEvent,
    ClientLeftView => ClientLeftViewEvent,
    ClientMoved => ClientMovedEvent,
    ChannelCreated => ChannelCreatedEvent,
    ChannelDeleted => ChannelDeletedEvent,
    ChannelEdited => ChannelEditedEvent,
    ChannelMoved => ChannelMovedEvent,
    ChannelDescriptionChanged => ChannelDescriptionChangedEvent,
    ChannelPasswordChanged => ChannelPasswordChangedEvent,
    TextMessage => TextMessageEvent,
    TokenUsed => TokenUsedEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{split_response, unmarshal_response};

    #[test]
    fn test_client_enter_view() {
        let line = "cfid=0 ctid=1 reasonid=0 clid=5 client_unique_identifier=abc= \
                    client_nickname=Some\\sUser client_servergroups=6,8 client_type=0 client_away=1";
        let mut e = ClientEnterViewEvent::default();
        unmarshal_response(&split_response(line), &mut e).unwrap();
        assert_eq!(e.to, 1);
        assert_eq!(e.reason, Some(Reason::MovedItself));
        assert_eq!(e.client_id, 5);
        assert_eq!(e.uid, "abc=");
        assert_eq!(e.nickname, "Some User");
        assert_eq!(e.server_groups, GroupList(vec![6, 8]));
        assert!(!e.is_server_query);
        assert!(e.away);
    }

    #[test]
    fn test_text_message() {
        let line = "targetmode=3 msg=hi\\sthere invokerid=0 invokername=Server invokeruid=serveradmin";
        let mut e = TextMessageEvent::default();
        unmarshal_response(&split_response(line), &mut e).unwrap();
        assert_eq!(e.target_mode, 3);
        assert_eq!(e.message, "hi there");
        assert_eq!(e.invoker_name, "Server");
    }

    #[test]
    fn test_bad_reason_is_reported() {
        let mut e = ClientMovedEvent::default();
        let err = unmarshal_response(&split_response("ctid=1 reasonid=2 clid=3"), &mut e).unwrap_err();
        assert!(err.to_string().contains("'reasonid' as reason"));
    }

    #[test]
    fn test_event_names() {
        let e: Event = ChannelDeletedEvent::default().into();
        assert_eq!(e.name(), "notifychanneldeleted");
        assert_eq!(EventCategory::TextPrivate.to_string(), "textprivate");
        assert!(EventCategory::Channel.is_scoped());
        assert!(!EventCategory::Server.is_scoped());
    }
}

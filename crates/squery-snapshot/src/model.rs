//! Decoded snapshot contents

use squery_core::record;
use squery_core::types::{Codec, Scope};

record! {
    /// Properties of the exported virtual server
    pub struct VirtualServerProperties {
        pub name: String => "virtualserver_name",
        pub uid: String => "virtualserver_unique_identifier",
        pub nickname: String => "virtualserver_nickname",
        pub name_phonetic: String => "virtualserver_name_phonetic",
        pub welcome_message: String => "virtualserver_welcomemessage",
        pub host_message: String => "virtualserver_hostmessage",
        pub host_message_mode: i32 => "virtualserver_hostmessage_mode",
        pub max_clients: i32 => "virtualserver_maxclients",
        pub reserved_slots: i32 => "virtualserver_reserved_slots",
        pub password: String => "virtualserver_password",
        pub has_password: bool => "virtualserver_flag_password",
        pub security_level: i32 => "virtualserver_needed_identity_security_level",
        pub weblist: bool => "virtualserver_weblist_enabled",
        pub icon_id: i64 => "virtualserver_icon_id",
        pub created: i64 => "virtualserver_created",
        pub codec_encryption_mode: i32 => "virtualserver_codec_encryption_mode",
        pub default_server_group: u32 => "virtualserver_default_server_group",
        pub default_channel_group: u32 => "virtualserver_default_channel_group",
        pub default_channel_admin_group: u32 => "virtualserver_default_channel_admin_group",
        pub hostbanner_url: String => "virtualserver_hostbanner_url",
        pub hostbanner_gfx_url: String => "virtualserver_hostbanner_gfx_url",
        pub hostbanner_gfx_interval: String => "virtualserver_hostbanner_gfx_interval",
        pub hostbanner_mode: i32 => "virtualserver_hostbanner_mode",
        pub hostbutton_tooltip: String => "virtualserver_hostbutton_tooltip",
        pub hostbutton_url: String => "virtualserver_hostbutton_url",
        pub hostbutton_gfx_url: String => "virtualserver_hostbutton_gfx_url",
        pub priority_speaker_dimm_modificator: f32 => "virtualserver_priority_speaker_dimm_modificator",
        pub complain_autoban_count: i32 => "virtualserver_complain_autoban_count",
        pub complain_autoban_time: i64 => "virtualserver_complain_autoban_time",
        pub complain_remove_time: i64 => "virtualserver_complain_remove_time",
        pub min_clients_in_channel_before_forced_silence: i32 => "virtualserver_min_clients_in_channel_before_forced_silence",
        pub antiflood_points_tick_reduce: i32 => "virtualserver_antiflood_points_tick_reduce",
        pub antiflood_points_needed_command_block: i32 => "virtualserver_antiflood_points_needed_command_block",
        pub antiflood_points_needed_ip_block: i32 => "virtualserver_antiflood_points_needed_ip_block",
        pub antiflood_points_needed_plugin_block: i32 => "virtualserver_antiflood_points_needed_plugin_block",
        pub max_download_total_bandwidth: u64 => "virtualserver_max_download_total_bandwidth",
        pub max_upload_total_bandwidth: u64 => "virtualserver_max_upload_total_bandwidth",
        pub download_quota: u64 => "virtualserver_download_quota",
        pub upload_quota: u64 => "virtualserver_upload_quota",
        pub log_client: bool => "virtualserver_log_client",
        pub log_query: bool => "virtualserver_log_query",
        pub log_channel: bool => "virtualserver_log_channel",
        pub log_permissions: bool => "virtualserver_log_permissions",
        pub log_server: bool => "virtualserver_log_server",
        pub log_filetransfer: bool => "virtualserver_log_filetransfer",
        pub file_storage_class: String => "virtualserver_file_storage_class",
        pub filebase: String => "virtualserver_filebase",
        pub keypair: String => "virtualserver_keypair",
        pub protocol_verify_keypair: String => "virtualserver_protocol_verify_keypair",
        pub accounting_token: String => "virtualserver_accounting_token",
        pub min_client_version: String => "virtualserver_min_client_version",
        pub min_android_version: String => "virtualserver_min_android_version",
        pub min_ios_version: String => "virtualserver_min_ios_version",
        pub temp_channel_default_delete_delay: u32 => "virtualserver_channel_temp_delete_delay_default",
    }
}

record! {
    pub struct SnapshotChannel {
        pub id: u32 => "channel_id",
        pub parent_id: u32 => "channel_pid",
        pub uid: String => "channel_unique_identifier",
        pub name: String => "channel_name",
        pub name_phonetic: String => "channel_name_phonetic",
        pub topic: String => "channel_topic",
        pub description: String => "channel_description",
        pub password: String => "channel_password",
        pub has_password: bool => "channel_flag_password",
        pub codec: Option<Codec> => "channel_codec",
        pub codec_quality: u32 => "channel_codec_quality",
        pub codec_latency_factor: u32 => "channel_codec_latency_factor",
        pub codec_is_unencrypted: bool => "channel_codec_is_unencrypted",
        pub max_clients: i32 => "channel_maxclients",
        pub max_family_clients: i32 => "channel_maxfamilyclients",
        pub max_clients_unlimited: bool => "channel_flag_maxclients_unlimited",
        pub max_family_clients_unlimited: bool => "channel_flag_maxfamilyclients_unlimited",
        pub max_family_clients_inherited: bool => "channel_flag_maxfamilyclients_inherited",
        pub order: u32 => "channel_order",
        pub permanent: bool => "channel_flag_permanent",
        pub semi_permanent: bool => "channel_flag_semi_permanent",
        pub default: bool => "channel_flag_default",
        pub filepath: String => "channel_filepath",
        pub security_salt: String => "channel_security_salt",
        pub banner_mode: i32 => "channel_banner_mode",
        pub banner_gfx_url: String => "channel_banner_gfx_url",
    }
}

record! {
    pub struct SnapshotClient {
        pub id: u32 => "client_id",
        pub uid: String => "client_unique_id",
        pub nickname: String => "client_nickname",
        pub description: String => "client_description",
        pub created: i64 => "client_created",
        pub last_connected: i64 => "client_lastconnected",
        pub total_connections: u32 => "client_totalconnections",
    }
}

record! {
    pub(crate) struct GroupHeader {
        pub id: u32 => "id",
        pub name: String => "name",
    }
}

record! {
    /// One permission granted to a group
    pub struct GroupPermission {
        pub id: String => "permid",
        pub value: i32 => "permvalue",
        pub skip: bool => "permskip",
        pub negated: bool => "permnegated",
    }
}

/// A server or channel group with its permissions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotGroup {
    pub id: u32,
    pub name: String,
    pub permissions: Vec<GroupPermission>,
}

record! {
    pub struct ServerGroupRelation {
        pub client_db_id: u32 => "cldbid",
        pub group_id: u32 => "gid",
    }
}

record! {
    pub struct ChannelGroupRelation {
        pub channel_id: u32 => "iid",
        pub client_db_id: u32 => "cldbid",
        pub group_id: u32 => "gid",
    }
}

record! {
    pub struct ClientPermission {
        pub client_db_id: u32 => "id1",
        pub permission: String => "permid",
        pub value: i32 => "permvalue",
        pub skip: bool => "permskip",
        pub negated: bool => "permnegated",
    }
}

record! {
    pub struct ChannelPermission {
        pub channel_id: u32 => "id1",
        pub permission: String => "permid",
        pub value: i32 => "permvalue",
        pub skip: bool => "permskip",
        pub negated: bool => "permnegated",
    }
}

record! {
    pub struct ChannelClientPermission {
        pub channel_id: u32 => "id1",
        pub client_db_id: u32 => "id2",
        pub permission: String => "permid",
        pub value: i32 => "permvalue",
        pub skip: bool => "permskip",
        pub negated: bool => "permnegated",
    }
}

record! {
    pub struct ApiKey {
        pub hash: String => "hash",
        pub client_uid: String => "cluid",
        pub scope: Option<Scope> => "scope",
        pub created_at: i64 => "created_at",
        pub expires_at: i64 => "expires_at",
    }
}

/// A decoded, decompressed snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub virtual_server: VirtualServerProperties,
    pub channels: Vec<SnapshotChannel>,
    pub clients: Vec<SnapshotClient>,
    pub server_groups: Vec<SnapshotGroup>,
    pub channel_groups: Vec<SnapshotGroup>,
    pub server_group_relations: Vec<ServerGroupRelation>,
    pub channel_group_relations: Vec<ChannelGroupRelation>,
    pub client_permissions: Vec<ClientPermission>,
    pub channel_permissions: Vec<ChannelPermission>,
    pub channel_client_permissions: Vec<ChannelClientPermission>,
    pub api_keys: Vec<ApiKey>,
}

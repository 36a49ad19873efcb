// Kept in sync by hand with the cetane migrations in `crate::migrations`.

diesel::table! {
    factories (id) {
        id -> Integer,
        name -> Text,
        operating_system -> Text,
        password_hash -> Nullable<Text>,
        ip -> Nullable<Text>,
        last_poll -> Nullable<Text>,
        last_upload -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    factory_screen_sizes (id) {
        id -> Integer,
        factory_id -> Integer,
        width -> Integer,
        height -> Integer,
    }
}

diesel::table! {
    factory_color_depths (id) {
        id -> Integer,
        factory_id -> Integer,
        bits_per_pixel -> Integer,
    }
}

diesel::table! {
    factory_browsers (id) {
        id -> Integer,
        factory_id -> Integer,
        browser_group -> Text,
        version -> Text,
        major -> Integer,
        minor -> Integer,
        command -> Text,
        javascript -> Integer,
        java -> Integer,
        flash -> Integer,
        active -> Integer,
    }
}

diesel::table! {
    plugin_versions (plugin, id) {
        plugin -> Text,
        id -> Integer,
        version -> Text,
    }
}

diesel::table! {
    request_groups (id) {
        id -> Integer,
        website -> Text,
        width -> Nullable<Integer>,
        height -> Nullable<Integer>,
        bits_per_pixel -> Nullable<Integer>,
        javascript -> Nullable<Integer>,
        java -> Nullable<Integer>,
        flash -> Nullable<Integer>,
        submitted -> Text,
        expire -> Text,
    }
}

diesel::table! {
    requests (id) {
        id -> Integer,
        request_group_id -> Integer,
        platform -> Nullable<Text>,
        browser_group -> Text,
        major -> Nullable<Integer>,
        minor -> Nullable<Integer>,
        priority -> Integer,
        factory_id -> Nullable<Integer>,
        locked_at -> Nullable<Text>,
        fulfilled_at -> Nullable<Text>,
    }
}

diesel::table! {
    domain_priorities (id) {
        id -> Integer,
        domain -> Text,
        priority -> Integer,
        expire -> Text,
    }
}

diesel::joinable!(factory_screen_sizes -> factories (factory_id));
diesel::joinable!(factory_color_depths -> factories (factory_id));
diesel::joinable!(factory_browsers -> factories (factory_id));
diesel::joinable!(requests -> request_groups (request_group_id));

diesel::allow_tables_to_appear_in_same_query!(
    factories,
    factory_screen_sizes,
    factory_color_depths,
    factory_browsers,
    plugin_versions,
    request_groups,
    requests,
    domain_priorities,
);

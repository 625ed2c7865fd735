diesel::table! {
    dry_files (id) {
        id -> Int8,
        producer_id -> Int4,
        session_id -> Int4,
        path -> Text,
        hash -> Text,
        size -> Int8,
    }
}

diesel::table! {
    dry_groups (id) {
        id -> Int8,
        producer_id -> Int4,
        session_id -> Int4,
        group_key -> Text,
        path -> Text,
        size -> Int8,
    }
}

diesel::table! {
    dry_log (id) {
        id -> Int8,
        producer_id -> Int4,
        session_id -> Int4,
        elapsed_ms -> Int8,
        level -> Text,
        message -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(dry_files, dry_groups, dry_log,);

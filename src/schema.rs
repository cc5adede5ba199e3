table! {
    coins (id) {
        id -> Int4,
        name -> VarChar,
        short_name -> VarChar,
        enabled -> Bool,
    }
}

table! {
    tx_statuses (id) {
        id -> Int4,
        name -> VarChar,
    }
}

table! {
    txs (id) {
        id -> Uuid,
        from_wallet_id -> Uuid,
        to_wallet_id -> Nullable<Uuid>,
        to_phone -> Nullable<VarChar>,
        to_address -> Nullable<VarChar>,
        amount -> Numeric,
        tx_type -> VarChar,
        status_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    txs_external (tx_id) {
        tx_id -> Uuid,
        hash -> VarChar,
        to_address -> VarChar,
        fee -> Numeric,
        created_at -> Timestamp,
    }
}

table! {
    wallets (id) {
        id -> Uuid,
        user_phone -> VarChar,
        coin_id -> Int4,
        address -> VarChar,
        name -> VarChar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(txs -> tx_statuses (status_id));
joinable!(txs_external -> txs (tx_id));
joinable!(wallets -> coins (coin_id));

allow_tables_to_appear_in_same_query!(coins, tx_statuses, txs, txs_external, wallets,);

diesel::table! {
    seats (row_num, col_num) {
        row_num -> Int4,
        col_num -> Int4,
        status -> Varchar,
        reserver_name -> Nullable<Varchar>,
        reserver_phone -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

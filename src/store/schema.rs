diesel::table! {
    questions (id) {
        id -> Uuid,
        prompt -> Nullable<Text>,
        text -> Nullable<Text>,
        answer_type -> Nullable<Text>,
        answer_choices -> Array<Text>,
        correct_answer_multiple -> Nullable<Text>,
        correct_answer_free -> Nullable<Text>,
        explanation -> Nullable<Text>,
        subject -> Text,
        topic -> Text,
        difficulty -> Text,
        access_option -> Nullable<Text>,
        images -> Jsonb,
        created_at -> Timestamptz,
        last_edited_at -> Timestamptz,
    }
}

diesel::table! {
    engagements (id) {
        id -> Uuid,
        user_id -> Uuid,
        question_id -> Uuid,
        status -> Text,
        flagged -> Bool,
        starred -> Bool,
        reviewed -> Bool,
        user_answer -> Nullable<Text>,
        attempt_time -> Nullable<Timestamptz>,
        first_attempt_time -> Nullable<Timestamptz>,
        duration_ms -> Nullable<Int8>,
        mode -> Nullable<Text>,
    }
}

diesel::table! {
    quizzes (id) {
        id -> Uuid,
        user_id -> Uuid,
        name -> Text,
        quiz_type -> Text,
        attempt_time -> Timestamptz,
        entries -> Jsonb,
    }
}

diesel::table! {
    tests (id) {
        id -> Uuid,
        user_id -> Uuid,
        name -> Text,
        quiz_ids -> Array<Uuid>,
        attempt_time -> Timestamptz,
        completed -> Bool,
    }
}

diesel::table! {
    datacubes (user_id) {
        user_id -> Uuid,
        rows -> Jsonb,
        computed_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(questions, engagements, quizzes, tests, datacubes);

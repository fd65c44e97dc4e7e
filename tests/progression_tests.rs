// tests/progression_tests.rs
//
// End-to-end coverage of the progression engine: sequential unlocking,
// quiz grading, progress percentages, enrollment completion, reset and
// force-complete.

use reqwest::Client;

mod common;

use common::{login, register_student, seed_instructor, spawn_app};

struct CourseFixture {
    course_id: i64,
    module_id: i64,
    quiz_id: i64,
    /// Three content items in course order; the second is a video with
    /// the quiz linked to it (so the course has four progress steps).
    item_ids: [i64; 3],
    question_ids: Vec<i64>,
}

/// Builds the standard fixture through the API: one module, three content
/// items, and a two-question quiz (1 point each, 60% to pass) linked to
/// the middle video item.
async fn build_course(address: &str, token: &str) -> CourseFixture {
    let client = Client::new();
    let auth = format!("Bearer {}", token);

    let course: serde_json::Value = client
        .post(format!("{}/api/courses", address))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "title": "Intro to Botany",
            "description": "Plants, from seed to canopy."
        }))
        .send()
        .await
        .expect("create course failed")
        .json()
        .await
        .unwrap();
    let course_id = course["id"].as_i64().unwrap();

    let module: serde_json::Value = client
        .post(format!("{}/api/courses/{}/modules", address, course_id))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "title": "Week 1", "order_index": 0 }))
        .send()
        .await
        .expect("create module failed")
        .json()
        .await
        .unwrap();
    let module_id = module["id"].as_i64().unwrap();

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "course_id": course_id,
            "title": "Week 1 checkpoint",
            "passing_percentage": 60,
            "questions": [
                {
                    "question_type": "mcq-single",
                    "text": "Which organelle runs photosynthesis?",
                    "options": [
                        { "text": "Chloroplast", "is_correct": true },
                        { "text": "Mitochondrion", "is_correct": false },
                        { "text": "Ribosome", "is_correct": false }
                    ]
                },
                {
                    "question_type": "true-false",
                    "text": "Roots grow toward light.",
                    "options": [
                        { "text": "True", "is_correct": false },
                        { "text": "False", "is_correct": true }
                    ]
                }
            ]
        }))
        .send()
        .await
        .expect("create quiz failed")
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    let mut item_ids = [0i64; 3];
    let payloads = [
        serde_json::json!({
            "title": "Reading: the plant cell",
            "content_type": "text",
            "body": "<p>Cells, walls, and chloroplasts.</p>",
            "order_index": 0
        }),
        serde_json::json!({
            "title": "Lecture: photosynthesis",
            "content_type": "video",
            "video_url": "https://videos.example.com/photosynthesis.mp4",
            "quiz_id": quiz_id,
            "order_index": 1
        }),
        serde_json::json!({
            "title": "Reading: root systems",
            "content_type": "text",
            "body": "<p>Taproots and fibrous roots.</p>",
            "order_index": 2
        }),
    ];
    for (i, payload) in payloads.iter().enumerate() {
        let item: serde_json::Value = client
            .post(format!(
                "{}/api/courses/{}/modules/{}/content",
                address, course_id, module_id
            ))
            .header("Authorization", &auth)
            .json(payload)
            .send()
            .await
            .expect("create content failed")
            .json()
            .await
            .unwrap();
        item_ids[i] = item["id"].as_i64().unwrap();
    }

    // Question ids come back (answer keys stripped) from the student view.
    let quiz_view: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .expect("get quiz failed")
        .json()
        .await
        .unwrap();
    let question_ids = quiz_view["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();

    CourseFixture {
        course_id,
        module_id,
        quiz_id,
        item_ids,
        question_ids,
    }
}

async fn get_progress(
    client: &Client,
    address: &str,
    auth: &str,
    course_id: i64,
) -> serde_json::Value {
    client
        .get(format!("{}/api/progress/courses/{}", address, course_id))
        .header("Authorization", auth)
        .send()
        .await
        .expect("get progress failed")
        .json()
        .await
        .unwrap()
}

async fn mark_complete(
    client: &Client,
    address: &str,
    auth: &str,
    fixture: &CourseFixture,
    content_id: i64,
) -> serde_json::Value {
    let response = client
        .post(format!(
            "{}/api/progress/courses/{}/modules/{}/content/{}/complete",
            address, fixture.course_id, fixture.module_id, content_id
        ))
        .header("Authorization", auth)
        .send()
        .await
        .expect("mark complete failed");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

async fn locked_ids(
    client: &Client,
    address: &str,
    auth: &str,
    course_id: i64,
) -> Vec<i64> {
    let body: serde_json::Value = client
        .get(format!(
            "{}/api/progress/courses/{}/locked",
            address, course_id
        ))
        .header("Authorization", auth)
        .send()
        .await
        .expect("get locked failed")
        .json()
        .await
        .unwrap();
    body["locked_content_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn sequential_unlock_and_progress_flow() {
    // Arrange
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let (inst_user, inst_pass) = seed_instructor(&pool).await;
    let inst_token = login(&address, &inst_user, &inst_pass).await;
    let fixture = build_course(&address, &inst_token).await;

    let student_token = register_student(&address).await;
    let auth = format!("Bearer {}", student_token);

    // 1. Enroll
    let response = client
        .post(format!("{}/api/courses/{}/enroll", address, fixture.course_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("enroll failed");
    assert_eq!(response.status().as_u16(), 201);

    // 2. Fresh enrollment: 0%, everything but the first item locked
    let progress = get_progress(&client, &address, &auth, fixture.course_id).await;
    assert_eq!(progress["percentage"], 0);
    assert_eq!(progress["status"], "active");

    let locked = locked_ids(&client, &address, &auth, fixture.course_id).await;
    assert!(!locked.contains(&fixture.item_ids[0]));
    assert!(locked.contains(&fixture.item_ids[1]));
    assert!(locked.contains(&fixture.item_ids[2]));

    // 3. First attempt: one correct answer, one blank -> 50, fail
    let q1 = fixture.question_ids[0];
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/attempts", address, fixture.quiz_id))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "responses": [
                { "question_id": q1, "type": "mcq-single", "selected": 0 }
            ]
        }))
        .send()
        .await
        .expect("submit failed")
        .json()
        .await
        .unwrap();
    assert_eq!(result["earned_points"], 1);
    assert_eq!(result["total_points"], 2);
    assert_eq!(result["score"], 50);
    assert_eq!(result["passed"], false);
    assert_eq!(result["attempt_number"], 1);

    // A failed attempt moves no progress
    let progress = get_progress(&client, &address, &auth, fixture.course_id).await;
    assert_eq!(progress["percentage"], 0);

    // 4. Work through the course: item 1 -> 25% (1 of 4 steps)
    let body = mark_complete(&client, &address, &auth, &fixture, fixture.item_ids[0]).await;
    assert_eq!(body["percentage"], 25);

    let locked = locked_ids(&client, &address, &auth, fixture.course_id).await;
    assert!(!locked.contains(&fixture.item_ids[1]));
    assert!(locked.contains(&fixture.item_ids[2]));

    // 5. Watch the video -> 50%; re-marking it changes nothing
    let body = mark_complete(&client, &address, &auth, &fixture, fixture.item_ids[1]).await;
    assert_eq!(body["percentage"], 50);
    let body = mark_complete(&client, &address, &auth, &fixture, fixture.item_ids[1]).await;
    assert_eq!(body["percentage"], 50);

    // 6. Second attempt, all correct -> pass; the quiz step lands -> 75%
    let (q1, q2) = (fixture.question_ids[0], fixture.question_ids[1]);
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/attempts", address, fixture.quiz_id))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "responses": [
                { "question_id": q1, "type": "mcq-single", "selected": 0 },
                { "question_id": q2, "type": "true-false", "selected": 1 }
            ],
            "time_spent_seconds": 90
        }))
        .send()
        .await
        .expect("submit failed")
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 100);
    assert_eq!(result["passed"], true);
    assert_eq!(result["attempt_number"], 2);

    let progress = get_progress(&client, &address, &auth, fixture.course_id).await;
    assert_eq!(progress["percentage"], 75);
    assert_eq!(progress["status"], "active");

    // 7. Last item -> 100%, enrollment completes
    let body = mark_complete(&client, &address, &auth, &fixture, fixture.item_ids[2]).await;
    assert_eq!(body["percentage"], 100);
    assert_eq!(body["course_completed"], true);

    let progress = get_progress(&client, &address, &auth, fixture.course_id).await;
    assert_eq!(progress["percentage"], 100);
    assert_eq!(progress["status"], "completed");

    // 8. Reset: history cleared, back to 0% / active, items relock
    let response = client
        .post(format!(
            "{}/api/progress/courses/{}/reset",
            address, fixture.course_id
        ))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("reset failed");
    assert_eq!(response.status().as_u16(), 200);

    let progress = get_progress(&client, &address, &auth, fixture.course_id).await;
    assert_eq!(progress["percentage"], 0);
    assert_eq!(progress["status"], "active");

    let locked = locked_ids(&client, &address, &auth, fixture.course_id).await;
    assert!(locked.contains(&fixture.item_ids[1]));

    // 9. Force-complete: the escape hatch, idempotent
    for _ in 0..2 {
        let response = client
            .post(format!(
                "{}/api/progress/courses/{}/complete",
                address, fixture.course_id
            ))
            .header("Authorization", &auth)
            .send()
            .await
            .expect("force complete failed");
        assert_eq!(response.status().as_u16(), 200);
    }
    let progress = get_progress(&client, &address, &auth, fixture.course_id).await;
    assert_eq!(progress["percentage"], 100);
    assert_eq!(progress["status"], "completed");
}

#[tokio::test]
async fn attempt_history_keeps_every_attempt_and_picks_the_best() {
    // Arrange
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let (inst_user, inst_pass) = seed_instructor(&pool).await;
    let inst_token = login(&address, &inst_user, &inst_pass).await;
    let fixture = build_course(&address, &inst_token).await;

    let student_token = register_student(&address).await;
    let auth = format!("Bearer {}", student_token);
    let (q1, q2) = (fixture.question_ids[0], fixture.question_ids[1]);

    client
        .post(format!("{}/api/courses/{}/enroll", address, fixture.course_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("enroll failed");

    // Act: three submissions scoring 50, 100, 100
    let submissions = [
        serde_json::json!({ "responses": [
            { "question_id": q1, "type": "mcq-single", "selected": 0 }
        ]}),
        serde_json::json!({ "responses": [
            { "question_id": q1, "type": "mcq-single", "selected": 0 },
            { "question_id": q2, "type": "true-false", "selected": 1 }
        ]}),
        serde_json::json!({ "responses": [
            { "question_id": q1, "type": "mcq-single", "selected": 0 },
            { "question_id": q2, "type": "true-false", "selected": 1 }
        ]}),
    ];
    for submission in &submissions {
        let response = client
            .post(format!("{}/api/quizzes/{}/attempts", address, fixture.quiz_id))
            .header("Authorization", &auth)
            .json(submission)
            .send()
            .await
            .expect("submit failed");
        assert_eq!(response.status().as_u16(), 201);
    }

    // Assert
    let history: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/attempts", address, fixture.quiz_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("history failed")
        .json()
        .await
        .unwrap();

    let attempts = history["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0]["attempt_number"], 1);
    assert_eq!(attempts[2]["attempt_number"], 3);

    // Best is the max score; the tie between attempts 2 and 3 goes to
    // the earlier one.
    assert_eq!(history["best"]["score"], 100);
    assert_eq!(history["best"]["attempt_number"], 2);
}

#[tokio::test]
async fn quiz_deletion_blocked_while_content_references_it() {
    // Arrange
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let (inst_user, inst_pass) = seed_instructor(&pool).await;
    let inst_token = login(&address, &inst_user, &inst_pass).await;
    let fixture = build_course(&address, &inst_token).await;

    // Act
    let response = client
        .delete(format!("{}/api/quizzes/{}", address, fixture.quiz_id))
        .header("Authorization", format!("Bearer {}", inst_token))
        .send()
        .await
        .expect("delete failed");

    // Assert
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn progress_routes_forbidden_without_enrollment() {
    // Arrange
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let (inst_user, inst_pass) = seed_instructor(&pool).await;
    let inst_token = login(&address, &inst_user, &inst_pass).await;
    let fixture = build_course(&address, &inst_token).await;

    let student_token = register_student(&address).await;
    let auth = format!("Bearer {}", student_token);

    // Act: never enrolled
    let response = client
        .post(format!(
            "{}/api/progress/courses/{}/modules/{}/content/{}/complete",
            address, fixture.course_id, fixture.module_id, fixture.item_ids[0]
        ))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("mark complete failed");

    // Assert
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .get(format!("{}/api/progress/courses/{}", address, fixture.course_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("get progress failed");
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn submitting_to_a_missing_quiz_is_not_found() {
    // Arrange
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let student_token = register_student(&address).await;

    // Act
    let response = client
        .post(format!("{}/api/quizzes/999999999/attempts", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "responses": [] }))
        .send()
        .await
        .expect("submit failed");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn malformed_answers_degrade_instead_of_erroring() {
    // Arrange
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = Client::new();

    let (inst_user, inst_pass) = seed_instructor(&pool).await;
    let inst_token = login(&address, &inst_user, &inst_pass).await;
    let fixture = build_course(&address, &inst_token).await;

    let student_token = register_student(&address).await;
    let auth = format!("Bearer {}", student_token);
    let (q1, q2) = (fixture.question_ids[0], fixture.question_ids[1]);

    // Act: an out-of-range index, a response shaped for the wrong
    // question type, and an unknown question id
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/attempts", address, fixture.quiz_id))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "responses": [
                { "question_id": q1, "type": "mcq-single", "selected": 42 },
                { "question_id": q2, "type": "fill-blank", "text": "false" },
                { "question_id": 999999999, "type": "mcq-single", "selected": 0 }
            ]
        }))
        .send()
        .await
        .expect("submit failed")
        .json()
        .await
        .unwrap();

    // Assert: scored, not rejected
    assert_eq!(result["score"], 0);
    assert_eq!(result["passed"], false);
    assert_eq!(result["answers"].as_array().unwrap().len(), 2);
}

//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rollcall_core::{
  attendance::{Action, AttendanceQuery, AttendanceStatus, NewInterval},
  device::DeviceConfig,
  person::{NewPerson, Role},
  punch::{LogStatus, NewTransactionLog},
  store::{AttendanceStore, DirectoryStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
}

fn student(name: &str) -> NewPerson {
  let mut p = NewPerson::new(name, format!("{}@example.com", name.to_lowercase()), Role::Student);
  p.guardian_phone = Some("+255700000001".into());
  p
}

// ─── People ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_person() {
  let s = store().await;

  let added = s.add_person(student("Amani")).await.unwrap();
  assert_eq!(added.role, Role::Student);

  let fetched = s.get_person(added.id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Amani");
  assert_eq!(fetched.guardian_phone.as_deref(), Some("+255700000001"));
  assert_eq!(fetched.created_at, added.created_at);
}

#[tokio::test]
async fn written_timestamps_match_what_is_read_back() {
  let s = store().await;
  let amani = s.add_person(student("Amani")).await.unwrap();
  let punched = at(7, 45) + Duration::nanoseconds(712_825_466);

  let opened = s
    .begin_interval(NewInterval::present(amani.id, punched))
    .await
    .unwrap()
    .unwrap();
  let log = s
    .append_transaction_log(NewTransactionLog {
      emp_code:   amani.id.to_string(),
      punch_time: punched,
      action:     Some(Action::CheckIn),
      status:     LogStatus::Success,
      reason:     None,
      device_sn:  None,
    })
    .await
    .unwrap();

  let latest = s.latest_interval(amani.id).await.unwrap().unwrap();
  assert_eq!(latest.check_in, opened.check_in);
  assert_eq!(opened.check_in, at(7, 45) + Duration::milliseconds(712));

  let logs = s.list_transaction_logs(10).await.unwrap();
  assert_eq!(logs[0].punch_time, log.punch_time);
  assert_eq!(logs[0].created_at, log.created_at);
}

#[tokio::test]
async fn get_person_missing_returns_none() {
  let s = store().await;
  assert!(s.get_person(42).await.unwrap().is_none());
}

#[tokio::test]
async fn list_people_is_ordered_by_name() {
  let s = store().await;
  s.add_person(student("Zuberi")).await.unwrap();
  s.add_person(student("Baraka")).await.unwrap();
  s.add_person(NewPerson::new("Mwalimu", "m@example.com", Role::Teacher))
    .await
    .unwrap();

  let names: Vec<_> = s
    .list_people()
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.name)
    .collect();
  assert_eq!(names, ["Baraka", "Mwalimu", "Zuberi"]);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.add_person(student("Amani")).await.unwrap();
  assert!(s.add_person(student("Amani")).await.is_err());
}

#[tokio::test]
async fn find_person_by_badge_or_id() {
  let s = store().await;
  let first = s.add_person(student("Amani")).await.unwrap();

  let mut badged = student("Baraka");
  // Deliberately equal to `first.id` rendered as text.
  badged.badge_number = Some(first.id.to_string());
  let second = s.add_person(badged).await.unwrap();

  let mut other = student("Chausiku");
  other.badge_number = Some("B-900".into());
  let third = s.add_person(other).await.unwrap();

  let by_badge = s.find_person_by_code("B-900".into()).await.unwrap().unwrap();
  assert_eq!(by_badge.id, third.id);

  // Badge match wins over an id match.
  let ambiguous = s
    .find_person_by_code(first.id.to_string())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(ambiguous.id, second.id);

  let by_id = s
    .find_person_by_code(third.id.to_string())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_id.id, third.id);

  assert!(s.find_person_by_code("nobody".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_and_delete_person() {
  let s = store().await;
  let p = s.add_person(student("Amani")).await.unwrap();

  let mut edit = student("Amani Juma");
  edit.role = Role::Staff;
  let updated = s.update_person(p.id, edit).await.unwrap().unwrap();
  assert_eq!(updated.name, "Amani Juma");
  assert_eq!(updated.role, Role::Staff);

  assert!(s.update_person(p.id + 100, student("Ghost")).await.unwrap().is_none());

  s.begin_interval(NewInterval::present(p.id, at(8, 0)))
    .await
    .unwrap()
    .unwrap();

  assert!(s.delete_person(p.id).await.unwrap());
  assert!(!s.delete_person(p.id).await.unwrap());
  assert!(s.get_person(p.id).await.unwrap().is_none());
  // Attendance cascades with the person.
  assert!(s.latest_interval(p.id).await.unwrap().is_none());
}

// ─── Intervals ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn begin_interval_refuses_second_open_interval() {
  let s = store().await;
  let p = s.add_person(student("Amani")).await.unwrap();

  let opened = s
    .begin_interval(NewInterval::present(p.id, at(8, 0)))
    .await
    .unwrap()
    .expect("first interval opens");
  assert!(opened.is_open());
  assert_eq!(opened.status, AttendanceStatus::Present);

  let second = s
    .begin_interval(NewInterval::present(p.id, at(8, 5)))
    .await
    .unwrap();
  assert!(second.is_none());

  let latest = s.latest_interval(p.id).await.unwrap().unwrap();
  assert_eq!(latest.id, opened.id);
}

#[tokio::test]
async fn close_interval_sets_check_out() {
  let s = store().await;
  let p = s.add_person(student("Amani")).await.unwrap();

  assert!(s.close_interval(p.id, at(9, 0)).await.unwrap().is_none());

  let opened = s
    .begin_interval(NewInterval::present(p.id, at(8, 0)))
    .await
    .unwrap()
    .unwrap();
  let closed = s.close_interval(p.id, at(15, 30)).await.unwrap().unwrap();
  assert_eq!(closed.id, opened.id);
  assert_eq!(closed.check_out, Some(at(15, 30)));

  // Nothing left to close.
  assert!(s.close_interval(p.id, at(16, 0)).await.unwrap().is_none());

  // A new interval may open once the previous one is closed.
  let reopened = s
    .begin_interval(NewInterval::present(p.id, at(16, 0)))
    .await
    .unwrap()
    .unwrap();
  let latest = s.latest_interval(p.id).await.unwrap().unwrap();
  assert_eq!(latest.id, reopened.id);
  assert!(latest.is_open());
}

#[tokio::test]
async fn list_attendance_filters_and_joins() {
  let s = store().await;
  let a = s.add_person(student("Amani")).await.unwrap();
  let b = s
    .add_person(NewPerson::new("Mwalimu", "m@example.com", Role::Teacher))
    .await
    .unwrap();

  let yesterday = at(8, 0) - Duration::days(1);
  s.begin_interval(NewInterval::present(a.id, yesterday)).await.unwrap();
  s.close_interval(a.id, yesterday + Duration::minutes(90)).await.unwrap();
  s.begin_interval(NewInterval::present(a.id, at(8, 0))).await.unwrap();
  s.begin_interval(NewInterval::present(b.id, at(7, 45))).await.unwrap();

  let all = s.list_attendance(AttendanceQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);
  // Newest check-in first.
  assert_eq!(all[0].interval.check_in, at(8, 0));
  assert_eq!(all[2].duration.as_deref(), Some("1.50h"));
  assert_eq!(all[2].user_name, "Amani");

  let today = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
  let todays = s
    .list_attendance(AttendanceQuery {
      start_date: Some(today),
      end_date: Some(today),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(todays.len(), 2);

  let teacher_only = s
    .list_attendance(AttendanceQuery { person_id: Some(b.id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(teacher_only.len(), 1);
  assert_eq!(teacher_only[0].user_role, Role::Teacher);

  let limited = s
    .list_attendance(AttendanceQuery { limit: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn list_attendance_filters_by_status() {
  let s = store().await;
  let a = s.add_person(student("Amani")).await.unwrap();
  let b = s.add_person(student("Baraka")).await.unwrap();

  s.begin_interval(NewInterval::present(a.id, at(7, 30))).await.unwrap();
  s.begin_interval(NewInterval {
    person_id: b.id,
    check_in:  at(8, 15),
    status:    AttendanceStatus::Late,
  })
  .await
  .unwrap();

  let late = s
    .list_attendance(AttendanceQuery {
      status: Some(AttendanceStatus::Late),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(late.len(), 1);
  assert_eq!(late[0].user_name, "Baraka");
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_people_matches_name_email_or_badge() {
  let s = store().await;
  let amani = s.add_person(student("Amani")).await.unwrap();
  let mut neema = student("Neema");
  neema.badge_number = Some("B-100".into());
  s.add_person(neema).await.unwrap();
  s.add_person(NewPerson::new("Mwalimu", "teacher@school.example", Role::Teacher))
    .await
    .unwrap();

  s.begin_interval(NewInterval::present(amani.id, at(7, 30))).await.unwrap();
  s.close_interval(amani.id, at(12, 0)).await.unwrap();
  s.begin_interval(NewInterval::present(amani.id, at(13, 0))).await.unwrap();

  let by_name = s.search_people("man".into(), 50).await.unwrap();
  assert_eq!(by_name.len(), 1);
  assert_eq!(by_name[0].person.id, amani.id);
  assert_eq!(by_name[0].attendance_count, 2);

  let by_badge = s.search_people("b-1".into(), 50).await.unwrap();
  assert_eq!(by_badge.len(), 1);
  assert_eq!(by_badge[0].person.name, "Neema");
  assert_eq!(by_badge[0].attendance_count, 0);

  let by_email = s.search_people("school".into(), 50).await.unwrap();
  assert_eq!(by_email[0].person.role, Role::Teacher);

  let everyone = s.search_people(String::new(), 2).await.unwrap();
  assert_eq!(everyone.len(), 2);
  assert_eq!(everyone[0].person.name, "Amani");

  // Wildcards in the text are literal.
  assert!(s.search_people("%".into(), 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_attendance_matches_name_status_or_date() {
  let s = store().await;
  let a = s.add_person(student("Amani")).await.unwrap();
  let b = s.add_person(student("Baraka")).await.unwrap();

  let yesterday = at(8, 0) - Duration::days(1);
  s.begin_interval(NewInterval::present(a.id, yesterday)).await.unwrap();
  s.close_interval(a.id, yesterday + Duration::hours(4)).await.unwrap();
  s.begin_interval(NewInterval {
    person_id: b.id,
    check_in:  at(8, 20),
    status:    AttendanceStatus::Late,
  })
  .await
  .unwrap();

  let by_name = s.search_attendance("amani".into(), 100).await.unwrap();
  assert_eq!(by_name.len(), 1);
  assert_eq!(by_name[0].interval.person_id, a.id);

  let by_status = s.search_attendance("late".into(), 100).await.unwrap();
  assert_eq!(by_status.len(), 1);
  assert_eq!(by_status[0].user_name, "Baraka");

  let by_date = s.search_attendance("2024-05-05".into(), 100).await.unwrap();
  assert_eq!(by_date.len(), 1);
  assert_eq!(by_date[0].interval.check_in, yesterday);

  assert!(s.search_attendance("nobody".into(), 100).await.unwrap().is_empty());
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn transaction_logs_are_listed_newest_first() {
  let s = store().await;

  s.append_transaction_log(NewTransactionLog {
    emp_code:   "17".into(),
    punch_time: at(8, 0),
    action:     Some(Action::CheckIn),
    status:     LogStatus::Success,
    reason:     None,
    device_sn:  Some("CQZ7224460246".into()),
  })
  .await
  .unwrap();
  s.append_transaction_log(NewTransactionLog {
    emp_code:   "17".into(),
    punch_time: at(8, 1),
    action:     None,
    status:     LogStatus::Rejected,
    reason:     Some("duplicate".into()),
    device_sn:  None,
  })
  .await
  .unwrap();

  let logs = s.list_transaction_logs(10).await.unwrap();
  assert_eq!(logs.len(), 2);
  assert_eq!(logs[0].status, LogStatus::Rejected);
  assert_eq!(logs[0].device_sn, "unknown");
  assert_eq!(logs[1].action, Some(Action::CheckIn));
  assert_eq!(logs[1].punch_time, at(8, 0));

  assert_eq!(s.list_transaction_logs(1).await.unwrap().len(), 1);
}

// ─── Device config ───────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_device_config_wins() {
  let s = store().await;
  assert!(s.device_config().await.unwrap().is_none());

  let first = DeviceConfig {
    base_url: "http://10.0.0.5".into(),
    username: "admin".into(),
    password: "one".into(),
  };
  let second = DeviceConfig { password: "two".into(), ..first.clone() };

  s.save_device_config(first).await.unwrap();
  s.save_device_config(second.clone()).await.unwrap();
  assert_eq!(s.device_config().await.unwrap(), Some(second));
}

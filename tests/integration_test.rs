use std::path::PathBuf;

use llm_web_capture::models::{load_question_sheet, save_question_sheet, ProfileStore};
use llm_web_capture::utils::logging;
use llm_web_capture::{Config, QuestionStatus, SessionManager, SubmissionMode};

/// 生成一个唯一的临时文件路径
fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "llm_web_capture_{}_{}_{}",
        std::process::id(),
        chrono::Local::now().format("%H%M%S%f"),
        name
    ))
}

#[tokio::test]
async fn test_profile_store_seeds_presets_and_saves() {
    let path = temp_path("profiles.toml");

    // 首次加载：文件不存在，用内置预设创建
    let mut store = ProfileStore::load(&path)
        .await
        .expect("加载配置库失败");
    assert!(path.exists(), "首次加载应当落盘预设");
    assert!(store.names().contains(&"ChatGPT"));
    assert!(store.names().contains(&"Claude"));
    assert!(store.names().contains(&"Gemini"));

    // 保存一个自定义目标
    let mut custom = store.get("ChatGPT").expect("预设应当存在").clone();
    custom.name = "内部问答".to_string();
    custom.address = "https://llm.example.com/chat".to_string();
    custom.submission_mode = SubmissionMode::ButtonClick;
    custom.submit_locator = Some("button.send".to_string());
    store.save_profile(custom).await.expect("保存目标失败");

    // 重新加载后自定义目标仍然存在
    let reloaded = ProfileStore::load(&path).await.expect("重新加载失败");
    let profile = reloaded.get("内部问答").expect("自定义目标应当存在");
    assert_eq!(profile.address, "https://llm.example.com/chat");
    assert_eq!(profile.submission_mode, SubmissionMode::ButtonClick);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_unknown_profile_is_rejected() {
    let path = temp_path("profiles_unknown.toml");
    let store = ProfileStore::load(&path).await.expect("加载配置库失败");

    let result = store.get("不存在的目标");
    assert!(result.is_err());
    assert!(result
        .err()
        .map(|e| e.to_string())
        .is_some_and(|msg| msg.contains("不存在的目标")));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_question_sheet_roundtrip_preserves_order_and_columns() {
    let in_path = temp_path("questions.toml");
    let out_path = temp_path("results.toml");

    let source = r#"
name = "冒烟测试"

[[questions]]
prompt = "第一题"
category = "常识"

[[questions]]
prompt = "第二题"

[[questions]]
prompt = "第三题"
priority = 7
"#;
    std::fs::write(&in_path, source).expect("写入测试清单失败");

    let mut sheet = load_question_sheet(in_path.to_str().expect("路径非法"))
        .await
        .expect("加载题目清单失败");
    assert_eq!(sheet.questions.len(), 3);
    assert!(sheet.questions.iter().all(|q| q.is_pending()));

    // 模拟一次部分完成的运行：前两题到达终态，第三题保持待处理
    sheet.questions[0].mark_success("回答一".to_string(), 1.5, false);
    sheet.questions[1].mark_failed("等待回答超时 (60 秒) 且页面上没有任何输出");

    save_question_sheet(&sheet, out_path.to_str().expect("路径非法"))
        .await
        .expect("保存结果失败");

    // 重新加载：顺序不变、额外列保留、待处理状态保留
    let reloaded = load_question_sheet(out_path.to_str().expect("路径非法"))
        .await
        .expect("重新加载失败");
    assert_eq!(reloaded.questions.len(), 3);
    assert_eq!(reloaded.questions[0].prompt, "第一题");
    assert_eq!(reloaded.questions[0].status, QuestionStatus::Success);
    assert_eq!(
        reloaded.questions[0]
            .extra
            .get("category")
            .and_then(|v| v.as_str()),
        Some("常识")
    );
    assert_eq!(reloaded.questions[1].status, QuestionStatus::Failed);
    assert!(reloaded.questions[1]
        .error_reason
        .as_deref()
        .is_some_and(|r| r.contains("超时")));
    // 取消/部分运行后，未处理的题目可以在下次运行中继续
    assert!(reloaded.questions[2].is_pending());
    assert_eq!(
        reloaded.questions[2]
            .extra
            .get("priority")
            .and_then(|v| v.as_integer()),
        Some(7)
    );

    let _ = std::fs::remove_file(&in_path);
    let _ = std::fs::remove_file(&out_path);
}

#[tokio::test]
async fn test_missing_question_sheet_is_error() {
    let result = load_question_sheet("不存在的清单.toml").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_session_open_failure_releases_lock() {
    // 不真正启动浏览器：用一个启动必然失败的配置验证占位会被释放
    let config = Config {
        sessions_dir: temp_path("sessions").display().to_string(),
        chrome_executable: Some("/不存在的浏览器".to_string()),
        ..Config::default()
    };
    let manager = SessionManager::new(&config);

    let profile = llm_web_capture::models::default_profiles()
        .into_iter()
        .next()
        .expect("应当有内置预设");

    // 启动失败后占位被释放，可以再次尝试打开
    assert!(manager.open(&profile, true).await.is_err());
    assert!(manager.open(&profile, true).await.is_err());
}

// ========== 以下测试需要本机装有 Chrome/Edge，默认忽略 ==========
// 运行方式：cargo test -- --ignored

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_open_session_and_probe() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();
    let manager = SessionManager::new(&config);

    let mut profile = llm_web_capture::models::default_profiles()
        .into_iter()
        .next()
        .expect("应当有内置预设");
    profile.name = "集成测试".to_string();
    profile.address = "https://example.com".to_string();

    // 打开会话
    let handle = manager
        .open(&profile, true)
        .await
        .expect("打开会话失败");

    // example.com 上不存在输入框，探测应当返回未登录
    let authed = manager.is_authenticated(handle.page(), &profile).await;
    assert!(!authed, "example.com 不应被判定为已登录");

    // 关闭并落盘
    manager.close(handle).await.expect("关闭会话失败");

    // 存储目录应当存在（会话状态已持久化）
    assert!(manager.storage_dir("集成测试").exists());
}

#[tokio::test]
#[ignore]
async fn test_single_question_capture() {
    // 初始化日志
    logging::init();

    // 加载配置
    // 注意：需要先以有头模式运行一次完成登录
    let config = Config::from_env();

    let app = llm_web_capture::App::initialize(config)
        .await
        .expect("初始化应用失败");

    let summary = app.run().await.expect("运行失败");
    assert!(summary.success + summary.failed + summary.skipped > 0);
}

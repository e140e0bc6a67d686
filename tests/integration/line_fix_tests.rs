/*!
 * In-place repair of glossaries and translations
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use segtrans::providers::mock::ScriptedTransport;
use segtrans::providers::TransportOutcome;
use segtrans::translation::{RunOptions, TaskKind};
use crate::common::{self, RunDirs};

const GLOSSARY: &str = "<cn>林风</cn> - <vi>Lâm Phong</vi>\n\
<cn>苏月</cn> - <vi>苏月</vi>\r\n\
random note\n\
<cn> 天剑宗 </cn> – <vi> 天剑宗 </vi>";

/// Only untranslated targets are sent; everything else stays byte for byte
#[tokio::test]
async fn test_fix_name_withUntranslatedTargets_shouldRewriteOnlyThoseLines() -> Result<()> {
    let dirs = RunDirs::new()?;
    let file = common::create_test_file(&dirs.input, "segment_1.txt", GLOSSARY)?;

    let transport = Arc::new(ScriptedTransport::new(|call| {
        if call.prompt.ends_with("苏月") {
            TransportOutcome::Text("Tô Nguyệt\n".into())
        } else {
            TransportOutcome::Text("Thiên Kiếm Tông".into())
        }
    }));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&RunOptions::new(TaskKind::FixName, &dirs.input))
        .await?;

    assert_eq!(transport.call_count(), 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        fs::read_to_string(&file)?,
        "<cn>林风</cn> - <vi>Lâm Phong</vi>\n\
<cn> 苏月 </cn> - <vi> Tô Nguyệt </vi>\r\n\
random note\n\
<cn> 天剑宗 </cn> - <vi> Thiên Kiếm Tông </vi>"
    );
    Ok(())
}

/// A file with nothing to fix makes no calls and is left untouched
#[tokio::test]
async fn test_fix_translation_withCleanFile_shouldMakeNoCalls() -> Result<()> {
    let dirs = RunDirs::new()?;
    let content = "Lâm Phong bước vào.\nTrời đã tối.\n";
    let file = common::create_test_file(&dirs.input, "segment_1.txt", content)?;
    let before = fs::metadata(&file)?.modified()?;

    let transport = Arc::new(ScriptedTransport::working());
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&RunOptions::new(TaskKind::FixTranslation, &dirs.input))
        .await?;

    assert_eq!(transport.call_count(), 0);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(fs::metadata(&file)?.modified()?, before);
    Ok(())
}

/// Lines whose attempts fail keep their original text while others are fixed
#[tokio::test]
async fn test_fix_translation_withOneFailingLine_shouldKeepItAndFixTheRest() -> Result<()> {
    let dirs = RunDirs::new()?;
    let file = common::create_test_file(
        &dirs.input,
        "segment_1.txt",
        "Lâm Phong 走 vào.\nTrời 黑 rồi.\nKhông sao.\n",
    )?;

    let transport = Arc::new(ScriptedTransport::new(|call| {
        if call.prompt.contains('走') {
            TransportOutcome::Text("Lâm Phong bước vào.".into())
        } else {
            TransportOutcome::NetworkFault("timeout".into())
        }
    }));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&RunOptions::new(TaskKind::FixTranslation, &dirs.input))
        .await?;

    assert_eq!(transport.call_count(), 4);
    assert_eq!(summary.warned, 1);
    assert_eq!(
        fs::read_to_string(&file)?,
        "Lâm Phong bước vào.\nTrời 黑 rồi.\nKhông sao.\n"
    );
    Ok(())
}

/// Losing the last key mid-file keeps the fixed lines and the untouched rest
#[tokio::test]
async fn test_fix_translation_withKeysExhausted_shouldWriteFixedLinesAndRetire() -> Result<()> {
    let dirs = RunDirs::new()?;
    let first = common::create_test_file(&dirs.input, "segment_1.txt", "A 走.\nB 跑.\nC 飞.\n")?;
    let second = common::create_test_file(&dirs.input, "segment_2.txt", "D 走.\n")?;

    let rate_limited = TransportOutcome::HttpError {
        status: 429,
        message: "quota".into(),
    };
    let transport = Arc::new(ScriptedTransport::always(rate_limited).with_script(
        "K1",
        vec![TransportOutcome::Text("A đi.".into())],
    ));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&RunOptions::new(TaskKind::FixTranslation, &dirs.input))
        .await?;

    assert_eq!(transport.call_count(), 4);
    assert_eq!(summary.disabled_keys, 1);
    assert_eq!(summary.completed(), 1);
    assert_eq!(fs::read_to_string(&first)?, "A đi.\nB 跑.\nC 飞.\n");
    assert_eq!(fs::read_to_string(&second)?, "D 走.\n");
    Ok(())
}

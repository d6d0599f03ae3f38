use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use drugmap::search::ImageSearch;

pub(crate) const SAMPLE_MARKDOWN: &str = "\u{feff}# 原研药清单

- 已收录约 3 种原研药。
- 统计截止时间：2024年5月。
- 数据来源：国家药监局。

药品分类及数量
- 心血管：12
- 呼吸：5

## 心血管

| 商品名 | 通用名 | 厂家简称 | 厂家全称 |
| --- | --- | --- | --- |
| 立普妥 | 阿托伐他汀钙片 | 辉瑞 | 辉瑞制药有限公司 |
| Norvasc | 苯磺酸氨氯地平片 | 辉瑞 | 辉瑞制药有限公司 |

## 呼吸 Drugs

| 商品名 | 通用名 | 厂家简称 | 厂家全称 |
| --- | --- | --- | --- |
| 顺尔宁 | 孟鲁司特钠片 | 默沙东 | 默沙东（中国）有限公司 |
";

pub(crate) const BARE_MARKDOWN: &str = "# Drugs

## Alpha

| Brand | Generic | Short | Full |
| --- | --- | --- | --- |
| A1 | G1 | S1 | F1 |
| A2 | G2 | S2 | F2 |

## Beta

| Brand | Generic | Short | Full |
| --- | --- | --- | --- |
| B1 | G3 | S3 | F3 |
";

#[derive(Debug, Clone)]
pub(crate) enum StubAnswer {
    Found(String),
    NotFound,
    Fail,
}

/// Image search returning a fixed answer and recording every query.
pub(crate) struct StubImageSearch {
    answer: StubAnswer,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StubImageSearch {
    pub fn new(answer: StubAnswer) -> Self {
        StubImageSearch {
            answer,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("Stub mutex poisoned").clone()
    }
}

#[async_trait]
impl ImageSearch for StubImageSearch {
    async fn search(&self, query: &str) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("Stub mutex poisoned")
            .push(query.to_string());

        match &self.answer {
            StubAnswer::Found(url) => Ok(Some(url.clone())),
            StubAnswer::NotFound => Ok(None),
            StubAnswer::Fail => Err(anyhow::anyhow!("stub failure")),
        }
    }
}

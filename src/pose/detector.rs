use anyhow::{Context, Result};
use opencv::core::Mat;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::normalize::SourceKind;
use super::preprocess::{preprocess_for_multipose, MULTIPOSE_INPUT_SIZE};

/// ソース固有の関節1点（正規化座標 + 信頼度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawJoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// 検出された1人分の生ランドマーク列（関節数はソース依存）
#[derive(Debug, Clone, PartialEq)]
pub struct RawPerson {
    pub joints: Vec<RawJoint>,
}

/// フレーム1枚から人物ランドマークを検出するソース
///
/// モデル実装は差し替え可能。関節数と並びはソースごとに異なるため、
/// 利用側は `source_kind()` に対応する正規化テーブルで正準順へ揃える。
pub trait LandmarkSource {
    fn source_kind(&self) -> SourceKind;

    /// 1フレームを検出する。人数はゼロのこともある。
    fn detect(&mut self, frame: &Mat) -> Result<Vec<RawPerson>>;
}

/// MoveNet MultiPose を使用した複数人姿勢検出器
///
/// 出力は [1, 6, 56]: 人物ごとに 17キーポイント×(y, x, score) の51要素 +
/// バウンディングボックス(ymin, xmin, ymax, xmax) + 人物スコア
pub struct MoveNetDetector {
    session: Session,
    max_poses: usize,
    score_threshold: f32,
}

impl MoveNetDetector {
    /// ONNXモデルを読み込んで初期化
    ///
    /// モデルやリソースが読めない場合はここで失敗する。以降の検出が
    /// 空を返すのは「誰も映っていない」であり、初期化失敗とは区別される。
    pub fn new<P: AsRef<Path>>(model_path: P, max_poses: usize, score_threshold: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load pose ONNX model (pose detection unavailable)")?;

        Ok(Self {
            session,
            max_poses,
            score_threshold,
        })
    }
}

impl LandmarkSource for MoveNetDetector {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Coco17
    }

    fn detect(&mut self, frame: &Mat) -> Result<Vec<RawPerson>> {
        let input = preprocess_for_multipose(frame, MULTIPOSE_INPUT_SIZE)?;
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["input" => input_tensor])
            .context("Pose inference failed")?;

        let output: ndarray::ArrayViewD<f32> = outputs["output_0"]
            .try_extract_array()
            .context("Failed to extract pose output tensor")?;

        let candidates = output.shape()[1];
        let mut people = Vec::new();

        for p in 0..candidates {
            if people.len() >= self.max_poses {
                break;
            }
            let person_score = output[[0, p, 55]];
            if person_score < self.score_threshold {
                continue;
            }

            let mut joints = Vec::with_capacity(17);
            for k in 0..17 {
                let y = output[[0, p, k * 3]];
                let x = output[[0, p, k * 3 + 1]];
                let confidence = output[[0, p, k * 3 + 2]];
                joints.push(RawJoint { x, y, confidence });
            }
            people.push(RawPerson { joints });
        }

        Ok(people)
    }
}

//! 量子化出力ベクトルのデコード

use crate::quantization::QuantParams;

/// 出力ベクトル全体を逆量子化
pub fn dequantize_all(output: &[u8], params: &QuantParams) -> Vec<f32> {
    output.iter().map(|&q| params.dequantize(q)).collect()
}

/// 最大スコアのインデックスを取得
///
/// 同値の場合は先に現れたインデックスを採用する。空なら None。
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// 逆量子化済みの勝者
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopClass {
    pub index: usize,
    pub score: f32,
}

/// 量子化出力から最上位クラスを選ぶ
pub fn top_class(output: &[u8], params: &QuantParams) -> Option<TopClass> {
    let scores = dequantize_all(output, params);
    argmax(&scores).map(|index| TopClass {
        index,
        score: scores[index],
    })
}

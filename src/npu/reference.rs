/// Golden integer model of one dump: column sums and requantization
use super::ppu::{quantize, QuantParams};
use super::types::{Acc, Data};

/// 对所有激活向量求 sum_i sum_r a[i][r] * w[r][c]，32位回绕
///
/// `weights` 为 K x N，每个激活向量长度为 K（不足部分视为0）。
pub fn column_sums(weights: &[Vec<Data>], acts: &[Vec<Data>]) -> Vec<Acc> {
  let cols = weights.first().map_or(0, Vec::len);
  let mut sums = vec![0 as Acc; cols];
  for act in acts {
    for (r, w_row) in weights.iter().enumerate() {
      let a = Acc::from(act.get(r).copied().unwrap_or(0));
      for (sum, w) in sums.iter_mut().zip(w_row) {
        *sum = sum.wrapping_add(a * Acc::from(*w));
      }
    }
  }
  sums
}

pub fn quantize_vector(sums: &[Acc], params: &QuantParams) -> Vec<Data> {
  sums
    .iter()
    .enumerate()
    .map(|(c, acc)| quantize(*acc, params.bias_for(c), params))
    .collect()
}

/// y = quantize(x . W + b)
pub fn matvec(x: &[Data], weights: &[Vec<Data>], params: &QuantParams) -> Vec<Data> {
  quantize_vector(&column_sums(weights, &[x.to_vec()]), params)
}

/// 分类结果：分数最高的类别，并列时取下标最小者
pub fn argmax(scores: &[Data]) -> Option<usize> {
  scores
    .iter()
    .enumerate()
    .fold(None, |best: Option<(usize, Data)>, (i, &v)| match best {
      Some((_, b)) if b >= v => best,
      _ => Some((i, v)),
    })
    .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_two_by_two() {
    let w = vec![vec![1, 2], vec![3, 4]];
    assert_eq!(column_sums(&w, &[vec![1, 1]]), vec![4, 6]);
    assert_eq!(column_sums(&w, &[vec![1, 1], vec![2, 0]]), vec![6, 10]);
    assert_eq!(matvec(&[1, 1], &w, &QuantParams::default()), vec![4, 6]);
  }

  #[test]
  fn test_bias_per_column() {
    let w = vec![vec![1, 1]];
    let p = QuantParams::default().with_bias(vec![10, -10]);
    assert_eq!(matvec(&[5], &w, &p), vec![15, -5]);
  }

  #[test]
  fn test_argmax_takes_first_maximum() {
    assert_eq!(argmax(&[3, 7, -1, 7]), Some(1));
    assert_eq!(argmax(&[-128, -128]), Some(0));
    assert_eq!(argmax(&[]), None);
  }
}

//! JWT Claims 構造体。

use serde::{Deserialize, Serialize};

/// Claims はアクセストークンの Claims を表す。
/// scope 以外は RFC 7519 の登録済み Claim のみを保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// トークン発行者
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// トークンの主体（ユーザー ID）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// トークンの対象オーディエンス
    #[serde(default, skip_serializing_if = "Audience::is_empty")]
    pub aud: Audience,

    /// 有効期限（Unix タイムスタンプ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// 発行時刻（Unix タイムスタンプ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// 有効開始時刻（Unix タイムスタンプ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// JWT ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Authorized party
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// スペース区切りのスコープ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Audience は JWT の aud Claim を表す。
/// 文字列または文字列配列のどちらも受け付ける。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(pub Vec<String>);

impl Audience {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 値がちょうど 1 つの場合のみ、その値を返す。
    pub fn single(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience(vec![value.to_string()])
    }
}

impl Serialize for Audience {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.single() {
            Some(aud) => serializer.serialize_str(aud),
            None => self.0.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct AudienceVisitor;

        impl<'de> de::Visitor<'de> for AudienceVisitor {
            type Value = Audience;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Audience(vec![v.to_string()]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(v) = seq.next_element::<String>()? {
                    values.push(v);
                }
                Ok(Audience(values))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Audience::default())
            }
        }

        deserializer.deserialize_any(AudienceVisitor)
    }
}

impl Claims {
    /// スコープを個々のトークンに分割して返す。
    /// 連続したスペースから生じる空要素は含めない。
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split(' ')
            .filter(|s| !s.is_empty())
    }
}

impl std::fmt::Display for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Claims{{sub={:?}, iss={:?}, aud={:?}, scope={:?}}}",
            self.sub, self.iss, self.aud.0, self.scope,
        )
    }
}

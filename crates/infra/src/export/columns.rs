use std::collections::BTreeSet;

use super::ExportObject;

const HEADER_LABELS: &[(&str, &str)] = &[
    ("id", "ID"),
    ("user_login", "Логин пользователя"),
    ("username", "Имя пользователя"),
    ("email", "Электронная почта"),
    ("created_at", "Дата создания"),
    ("updated_at", "Дата обновления"),
    ("is_active", "Активен"),
    ("is_admin", "Администратор"),
    ("fiscal_number", "Фискальный номер"),
    ("factory_number", "Заводской номер"),
    ("inn", "ИНН"),
    ("company_name", "Название компании"),
    ("address", "Адрес"),
    ("cash_register_number", "Номер кассового аппарата"),
    ("module_number", "Номер модуля"),
    ("assembly_number", "Номер сборки"),
    ("last_request_date", "Дата последнего запроса"),
    ("database_update_date", "Дата обновления базы данных"),
    ("status", "Статус"),
    ("status_changed_by_admin", "Статус изменён администратором"),
    ("free_record_balance", "Баланс свободных записей"),
    ("password", "Пароль"),
    ("phone", "Телефон"),
    ("role", "Роль"),
    ("last_login", "Последний вход"),
    ("registration_date", "Дата регистрации"),
    ("balance", "Баланс"),
    ("activation_date", "Дата активации"),
    ("expiration_date", "Дата истечения срока"),
    ("notes", "Примечания"),
    ("department", "Отдел"),
    ("position", "Должность"),
    ("salary", "Зарплата"),
    ("manager", "Менеджер"),
    ("region", "Регион"),
    ("city", "Город"),
    ("postal_code", "Почтовый индекс"),
    ("country", "Страна"),
    ("website", "Веб-сайт"),
    ("tax_number", "Налоговый номер"),
    ("legal_entity", "Юридическое лицо"),
    ("contract_number", "Номер договора"),
    ("contract_date", "Дата договора"),
    ("service_plan", "Тарифный план"),
    ("last_payment_date", "Дата последнего платежа"),
    ("next_payment_date", "Дата следующего платежа"),
    ("total_transactions", "Общее количество транзакций"),
    ("total_revenue", "Общая выручка"),
    ("average_check", "Средний чек"),
    ("loyalty_points", "Баллы лояльности"),
    ("referral_code", "Реферальный код"),
    ("last_maintenance_date", "Дата последнего обслуживания"),
    ("software_version", "Версия ПО"),
    ("hardware_model", "Модель оборудования"),
    ("connection_type", "Тип подключения"),
    ("ip_address", "IP-адрес"),
    ("mac_address", "MAC-адрес"),
    ("last_sync_date", "Дата последней синхронизации"),
    ("timezone", "Часовой пояс"),
    ("language", "Язык"),
    ("currency", "Валюта"),
];

/// Human-readable column title; unknown keys are used as-is.
pub fn header_label(key: &str) -> &str {
    HEADER_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(key, |(_, label)| *label)
}

/// Column order: `id` first when present, then the remaining keys sorted.
pub(crate) fn column_order(objects: &[ExportObject]) -> Vec<&str> {
    let keys: BTreeSet<&str> = objects.iter().flat_map(|o| o.keys().map(String::as_str)).collect();

    let mut columns = Vec::with_capacity(keys.len());
    if keys.contains("id") {
        columns.push("id");
    }
    columns.extend(keys.into_iter().filter(|k| *k != "id"));
    columns
}

/// Translated header row, in [`column_order`].
pub(crate) fn header_row<'a>(columns: &[&'a str]) -> Vec<&'a str> {
    columns.iter().map(|c| header_label(c)).collect()
}
